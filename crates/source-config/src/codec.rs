//! Reading and writing source configs.
//!
//! - YAML is the canonical on-disk format; unknown keys are rejected.
//! - TOML is accepted for values written by older components. Every unknown
//!   key is collected and reported in a single error.
//! - JSON is only produced, for logs and introspection.
//!
//! Every successful decode runs the structural adjustment of the nested
//! sections, so a decoded config always carries the same defaults as
//! [`SourceConfig::new`].

use crate::db::mask_password;
use crate::error::{DecodeError, EncodeError};
use crate::model::SourceConfig;
use std::path::Path;
use tracing::{debug, error};

/// Sample source config shipped with the worker.
pub const SAMPLE_CONFIG: &str = include_str!("../source.yaml");

/// Text formats a config can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    /// Display only
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Yaml => write!(f, "yaml"),
            ConfigFormat::Toml => write!(f, "toml"),
            ConfigFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(format!("Unknown config format: {s}")),
        }
    }
}

// Known keys per TOML section, used to report every unknown key at once.
struct Section {
    fields: &'static [&'static str],
    nested: &'static [(&'static str, &'static Section)],
}

static SECURITY_SECTION: Section = Section {
    fields: &["ssl-ca", "ssl-cert", "ssl-key", "cert-allowed-cn"],
    nested: &[],
};

static DB_SECTION: Section = Section {
    // `session` is a free-form map of session variables
    fields: &[
        "host",
        "port",
        "user",
        "password",
        "max-allowed-packet",
        "session",
    ],
    nested: &[("security", &SECURITY_SECTION)],
};

static PURGE_SECTION: Section = Section {
    fields: &["interval", "expires", "remain-space"],
    nested: &[],
};

static CHECKER_SECTION: Section = Section {
    fields: &["check-enable", "backoff-rollback", "backoff-max"],
    nested: &[],
};

static SOURCE_SECTION: Section = Section {
    fields: &[
        "enable-gtid",
        "auto-fix-gtid",
        "relay-dir",
        "meta-dir",
        "flavor",
        "charset",
        "enable-relay",
        "relay-binlog-name",
        "relay-binlog-gtid",
        "source-id",
        "server-id",
        "tracer",
    ],
    nested: &[
        ("from", &DB_SECTION),
        ("purge", &PURGE_SECTION),
        ("checker", &CHECKER_SECTION),
    ],
};

fn collect_undecoded(table: &toml::Table, section: &Section, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in table {
        if let Some((_, nested)) = section.nested.iter().find(|(name, _)| name == key) {
            // a non-table value here is a type error left to the decoder
            if let toml::Value::Table(inner) = value {
                collect_undecoded(inner, nested, &format!("{prefix}{key}."), out);
            }
        } else if !section.fields.contains(&key.as_str()) {
            out.push(format!("{prefix}{key}"));
        }
    }
}

impl SourceConfig {
    /// Decode a config from `content` in `format`.
    pub fn decode(format: ConfigFormat, content: &str) -> Result<Self, DecodeError> {
        match format {
            ConfigFormat::Yaml => Self::from_yaml(content),
            ConfigFormat::Toml => Self::from_toml(content),
            ConfigFormat::Json => Err(DecodeError::DisplayOnlyFormat),
        }
    }

    /// Encode the config in `format`. JSON output masks the password.
    pub fn encode(&self, format: ConfigFormat) -> Result<String, EncodeError> {
        match format {
            ConfigFormat::Yaml => self.to_yaml(),
            ConfigFormat::Toml => self.to_toml(),
            ConfigFormat::Json => self.to_json_display(),
        }
    }

    /// Decode a YAML document, rejecting unknown keys.
    pub fn from_yaml(content: &str) -> Result<Self, DecodeError> {
        let mut cfg: SourceConfig = serde_yaml::from_str(content)?;
        cfg.adjust_structure();
        Ok(cfg)
    }

    /// Decode a legacy TOML document.
    pub fn from_toml(content: &str) -> Result<Self, DecodeError> {
        let table: toml::Table = content.parse()?;

        let mut undecoded = Vec::new();
        collect_undecoded(&table, &SOURCE_SECTION, "", &mut undecoded);
        if !undecoded.is_empty() {
            undecoded.sort();
            return Err(DecodeError::UndecodedItems(undecoded.join(",")));
        }

        let mut cfg: SourceConfig = toml::from_str(content)?;
        cfg.adjust_structure();
        Ok(cfg)
    }

    /// Load a YAML config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DecodeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_yaml(&content)?;
        debug!(path = %path.display(), source_id = %cfg.source_id, "Loaded source config");
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String, EncodeError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_toml(&self) -> Result<String, EncodeError> {
        Ok(toml::to_string(self)?)
    }

    /// JSON rendering for logs. Legacy fields are omitted and a non-empty
    /// password is replaced by a mask.
    pub fn to_json_display(&self) -> Result<String, EncodeError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(password) = value
            .get_mut("from")
            .and_then(|from| from.get_mut("password"))
        {
            *password = serde_json::Value::String(mask_password(&self.from.password).to_string());
        }
        Ok(serde_json::to_string(&value)?)
    }
}

impl std::fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_json_display() {
            Ok(json) => f.write_str(&json),
            Err(e) => {
                error!(error = %e, "Failed to marshal source config to JSON");
                Ok(())
            }
        }
    }
}
