//! Error types for loading, verifying and completing a source config.
//!
//! Each stage of the config lifecycle has its own error type so callers can
//! tell an operator exactly what to fix:
//!
//! - [`DecodeError`] - the document could not be read or decoded
//! - [`ValidationError`] - the decoded values are inconsistent
//! - [`DiscoveryError`] - the live upstream could not complete the config

use std::path::PathBuf;
use std::time::Duration;

/// Error decoding a config document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Error reading the config file
    #[error("Failed to read source config from {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML (including unknown keys)
    #[error("Failed to decode source config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error parsing TOML
    #[error("Failed to decode source config from TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML document contains keys the config does not know about
    #[error("Source config contains undecoded items: {0}")]
    UndecodedItems(String),

    /// The JSON rendering is for diagnostics only
    #[error("JSON is a display-only format and cannot be decoded")]
    DisplayOnlyFormat,
}

/// Error encoding a config document.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Failed to encode source config to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to encode source config to TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Failed to encode source config to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Static consistency violation found by [`crate::SourceConfig::verify`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Source config must specify a source-id")]
    NeedSourceId,

    #[error("Source id '{source_id}' is too long, max length is {max}")]
    SourceIdTooLong { source_id: String, max: usize },

    #[error("Invalid relay-binlog-name '{0}'")]
    RelayBinlogName(String),

    #[error("Invalid relay-binlog-gtid '{gtid}' for flavor '{flavor}': {reason}")]
    RelayBinlogGtid {
        flavor: String,
        gtid: String,
        reason: String,
    },
}

/// Error completing a config against the live upstream.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The shared discovery deadline expired while waiting on the upstream
    #[error("Upstream timed out while querying {step}: time cost exceeds {bound:?}")]
    UpstreamTimeout { step: DiscoveryStep, bound: Duration },

    /// The upstream answered with an error
    #[error("Upstream failed while querying {step}: {source}")]
    Upstream {
        step: DiscoveryStep,
        #[source]
        source: anyhow::Error,
    },

    #[error("Flavor '{0}' is not supported, expected 'mysql' or 'mariadb'")]
    UnsupportedFlavor(String),

    #[error("Can't find a random available server ID after {attempts} attempts")]
    ServerIdExhausted { attempts: usize },

    #[error("Source '{source_id}' must have GTID_MODE ON, but upstream reports '{value}'")]
    GtidModeMismatch { source_id: String, value: String },
}

impl DiscoveryError {
    /// Whether re-running the whole discovery later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DiscoveryError::UpstreamTimeout { .. } | DiscoveryError::ServerIdExhausted { .. }
        )
    }

    /// Whether the error originates from the upstream database rather than
    /// from the config itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DiscoveryError::UpstreamTimeout { .. } | DiscoveryError::Upstream { .. }
        )
    }
}

/// Query issued against the upstream during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    Flavor,
    ServerIds,
    GtidMode,
}

impl std::fmt::Display for DiscoveryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryStep::Flavor => write!(f, "flavor"),
            DiscoveryStep::ServerIds => write!(f, "server-id"),
            DiscoveryStep::GtidMode => write!(f, "gtid-mode"),
        }
    }
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
