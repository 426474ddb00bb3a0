//! The source config entity and its nested policy sections.

use crate::checker::CheckerConfig;
use crate::db::DbConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length of a `source-id`.
pub const MAX_SOURCE_ID_LENGTH: usize = 32;

pub const MYSQL_FLAVOR: &str = "mysql";
pub const MARIADB_FLAVOR: &str = "mariadb";

/// SQL server dialect of the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Mysql,
    Mariadb,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Mysql => MYSQL_FLAVOR,
            Flavor::Mariadb => MARIADB_FLAVOR,
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MYSQL_FLAVOR => Ok(Flavor::Mysql),
            MARIADB_FLAVOR => Ok(Flavor::Mariadb),
            _ => Err(format!("Unknown flavor: {s}")),
        }
    }
}

/// Relay log purge policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PurgeConfig {
    /// Check whether a purge is needed every `interval` seconds
    pub interval: i64,
    /// Relay files older than `expires` hours can be purged (0 disables)
    pub expires: i64,
    /// Purge when free space under the relay dir drops below `remain-space` GB
    pub remain_space: i64,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            interval: 60 * 60,
            expires: 0,
            remain_space: 15,
        }
    }
}

/// Settings that are still accepted on decode for older deployments but are
/// never emitted again.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct LegacyTracer(pub Option<BTreeMap<String, serde_json::Value>>);

impl LegacyTracer {
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Configuration of a replication source worker, one per upstream.
///
/// Built with static defaults, populated from a YAML/TOML document, checked by
/// [`SourceConfig::verify`] and optionally completed against the live upstream
/// by [`crate::adjust::Adjuster`].
///
/// The struct owns all of its data, so `clone()` yields a fully independent
/// copy. Share a config across tasks by cloning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SourceConfig {
    pub enable_gtid: bool,
    pub auto_fix_gtid: bool,
    pub relay_dir: String,
    pub meta_dir: String,
    /// `mysql`, `mariadb`, or empty until discovered
    pub flavor: String,
    pub charset: String,

    pub enable_relay: bool,
    /// Relay starting point, if specified
    pub relay_binlog_name: String,
    pub relay_binlog_gtid: String,

    pub source_id: String,
    /// Replication client id presented to the upstream; 0 until discovered
    pub server_id: u32,

    pub from: DbConfig,
    pub purge: PurgeConfig,
    pub checker: CheckerConfig,

    #[serde(rename = "tracer", skip_serializing)]
    pub legacy_tracer: LegacyTracer,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let mut cfg = Self {
            enable_gtid: false,
            auto_fix_gtid: false,
            relay_dir: "relay-dir".to_string(),
            meta_dir: String::new(),
            flavor: String::new(),
            charset: String::new(),
            enable_relay: false,
            relay_binlog_name: String::new(),
            relay_binlog_gtid: String::new(),
            source_id: String::new(),
            server_id: 0,
            from: DbConfig::default(),
            purge: PurgeConfig::default(),
            checker: CheckerConfig::default(),
            legacy_tracer: LegacyTracer::default(),
        };
        cfg.adjust_structure();
        cfg
    }
}

impl SourceConfig {
    /// Create a config with the static defaults for an upstream source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill structural defaults on nested sections. Runs after every decode.
    pub(crate) fn adjust_structure(&mut self) {
        self.from.adjust();
        self.checker.adjust();
    }

    /// The configured flavor, if it is set and supported.
    pub fn parsed_flavor(&self) -> Option<Flavor> {
        self.flavor.parse().ok()
    }
}
