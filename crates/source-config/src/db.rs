//! Upstream connection descriptor (`from` section).

use crate::duration::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of idle connections kept by a pool opened from a [`DbConfig`].
pub const DEFAULT_MAX_IDLE_CONNS: usize = 2;

/// Session time zone forced on upstream connections unless configured.
pub const DEFAULT_SESSION_TIME_ZONE: &str = "+00:00";

/// Connection settings for the upstream MySQL/MariaDB server.
///
/// `password` holds whatever the operator wrote: usually a string produced by
/// [`crate::credential::encrypt`], sometimes plaintext. It is only decrypted on
/// a clone (see [`crate::SourceConfig::decrypted_clone`]).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed_packet: Option<u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub session: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,

    /// Operational policy, never read from or written to config files
    #[serde(skip)]
    pub raw: RawDbConfig,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            max_allowed_packet: None,
            session: BTreeMap::new(),
            security: None,
            raw: RawDbConfig::default(),
        }
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &mask_password(&self.password))
            .field("max_allowed_packet", &self.max_allowed_packet)
            .field("session", &self.session)
            .field("security", &self.security)
            .field("raw", &self.raw)
            .finish()
    }
}

impl DbConfig {
    /// Fill structural defaults after decoding.
    ///
    /// Session variable names are case-insensitive upstream, so they are
    /// normalized to lowercase; `time_zone` defaults to UTC.
    pub fn adjust(&mut self) {
        let session = std::mem::take(&mut self.session);
        self.session = session
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self.session
            .entry("time_zone".to_string())
            .or_insert_with(|| DEFAULT_SESSION_TIME_ZONE.to_string());
    }

    /// `host:port` of the upstream.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TLS material for the upstream connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SecurityConfig {
    pub ssl_ca: String,
    pub ssl_cert: String,
    pub ssl_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cert_allowed_cn: Vec<String>,
}

/// Pool and timeout policy applied when a live connection is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDbConfig {
    pub max_idle_conns: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for RawDbConfig {
    fn default() -> Self {
        Self {
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl RawDbConfig {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

pub(crate) fn mask_password(password: &str) -> &'static str {
    if password.is_empty() {
        ""
    } else {
        "******"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_lowercases_session_and_sets_time_zone() {
        let mut db = DbConfig::default();
        db.session
            .insert("SQL_MODE".to_string(), "ANSI_QUOTES".to_string());
        db.adjust();

        assert_eq!(db.session.get("sql_mode").map(String::as_str), Some("ANSI_QUOTES"));
        assert!(!db.session.contains_key("SQL_MODE"));
        assert_eq!(
            db.session.get("time_zone").map(String::as_str),
            Some(DEFAULT_SESSION_TIME_ZONE)
        );
    }

    #[test]
    fn test_adjust_keeps_configured_time_zone() {
        let mut db = DbConfig::default();
        db.session
            .insert("TIME_ZONE".to_string(), "+08:00".to_string());
        db.adjust();
        assert_eq!(db.session.get("time_zone").map(String::as_str), Some("+08:00"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let db = DbConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let rendered = format!("{db:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("******"));
    }

    #[test]
    fn test_raw_defaults() {
        let raw = RawDbConfig::default().with_read_timeout(Duration::from_secs(30));
        assert_eq!(raw.max_idle_conns, DEFAULT_MAX_IDLE_CONNS);
        assert_eq!(raw.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(raw.write_timeout, None);
    }
}
