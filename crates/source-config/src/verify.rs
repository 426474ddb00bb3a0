//! Static, database-independent checks.

use crate::binlog;
use crate::error::ValidationError;
use crate::gtid::parse_gtid_set;
use crate::model::{SourceConfig, MAX_SOURCE_ID_LENGTH};
use tracing::debug;

impl SourceConfig {
    /// Check the config for internal consistency. Stops at the first failure.
    pub fn verify(&self) -> Result<(), ValidationError> {
        if self.source_id.is_empty() {
            return Err(ValidationError::NeedSourceId);
        }
        if self.source_id.len() > MAX_SOURCE_ID_LENGTH {
            return Err(ValidationError::SourceIdTooLong {
                source_id: self.source_id.clone(),
                max: MAX_SOURCE_ID_LENGTH,
            });
        }

        if self.enable_relay {
            if !self.relay_binlog_name.is_empty()
                && !binlog::verify_filename(&self.relay_binlog_name)
            {
                return Err(ValidationError::RelayBinlogName(
                    self.relay_binlog_name.clone(),
                ));
            }
            if !self.relay_binlog_gtid.is_empty() {
                parse_gtid_set(self.parsed_flavor(), &self.relay_binlog_gtid).map_err(|e| {
                    ValidationError::RelayBinlogGtid {
                        flavor: self.flavor.clone(),
                        gtid: self.relay_binlog_gtid.clone(),
                        reason: e.to_string(),
                    }
                })?;
            }
        }

        // Exercise the cipher up front; the decrypted value is dropped here.
        let decrypted = self.decrypted_clone();
        debug!(
            source_id = %self.source_id,
            encrypted = decrypted.from.password != self.from.password,
            "Verified source config"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SourceConfig {
        let mut cfg = SourceConfig::new();
        cfg.source_id = "mysql-replica-01".to_string();
        cfg
    }

    #[test]
    fn test_verify_requires_source_id() {
        let cfg = SourceConfig::new();
        assert_eq!(cfg.verify(), Err(ValidationError::NeedSourceId));
    }

    #[test]
    fn test_verify_source_id_length() {
        let mut cfg = valid_config();
        cfg.source_id = "a".repeat(MAX_SOURCE_ID_LENGTH);
        assert!(cfg.verify().is_ok());

        cfg.source_id = "a".repeat(MAX_SOURCE_ID_LENGTH + 1);
        assert_eq!(
            cfg.verify(),
            Err(ValidationError::SourceIdTooLong {
                source_id: "a".repeat(MAX_SOURCE_ID_LENGTH + 1),
                max: MAX_SOURCE_ID_LENGTH,
            })
        );
    }

    #[test]
    fn test_verify_relay_binlog_name_only_when_relay_enabled() {
        let mut cfg = valid_config();
        cfg.relay_binlog_name = "not-a-binlog".to_string();
        assert!(cfg.verify().is_ok());

        cfg.enable_relay = true;
        assert_eq!(
            cfg.verify(),
            Err(ValidationError::RelayBinlogName("not-a-binlog".to_string()))
        );

        cfg.relay_binlog_name = "mysql-bin.000003".to_string();
        assert!(cfg.verify().is_ok());
    }

    #[test]
    fn test_verify_relay_binlog_gtid_uses_flavor_grammar() {
        let mut cfg = valid_config();
        cfg.enable_relay = true;
        cfg.flavor = "mysql".to_string();
        cfg.relay_binlog_gtid = "0-1-100".to_string();

        let err = cfg.verify().unwrap_err();
        let ValidationError::RelayBinlogGtid { flavor, gtid, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(flavor, "mysql");
        assert_eq!(gtid, "0-1-100");
        assert!(err.to_string().contains("0-1-100"));

        cfg.flavor = "mariadb".to_string();
        assert!(cfg.verify().is_ok());
    }

    #[test]
    fn test_verify_relay_binlog_gtid_unknown_flavor() {
        let mut cfg = valid_config();
        cfg.enable_relay = true;
        cfg.relay_binlog_gtid = "3e11fa47-71ca-11e1-9e33-c80aa9429562:1-5".to_string();
        assert!(cfg.verify().is_ok());

        cfg.relay_binlog_gtid = "bogus".to_string();
        assert!(matches!(
            cfg.verify(),
            Err(ValidationError::RelayBinlogGtid { .. })
        ));
    }

    #[test]
    fn test_verify_source_id_checked_before_relay() {
        let mut cfg = SourceConfig::new();
        cfg.enable_relay = true;
        cfg.relay_binlog_name = "bad".to_string();
        assert_eq!(cfg.verify(), Err(ValidationError::NeedSourceId));
    }

    #[test]
    fn test_verify_does_not_touch_password() {
        let mut cfg = valid_config();
        cfg.from.password = crate::credential::encrypt("123456").unwrap();
        let stored = cfg.from.password.clone();
        cfg.verify().unwrap();
        assert_eq!(cfg.from.password, stored);
    }
}
