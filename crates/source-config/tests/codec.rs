//! Decoding and encoding source configs.

use source_config::credential::{decrypt_or_plaintext, encrypt};
use source_config::{ConfigFormat, DecodeError, SourceConfig, SAMPLE_CONFIG};
use std::io::Write;
use tempfile::NamedTempFile;

const FULL_YAML: &str = r#"
source-id: "mysql-replica-01"
flavor: "mysql"
server-id: 101
enable-gtid: true
auto-fix-gtid: false
enable-relay: true
relay-binlog-name: "mysql-bin.000003"
relay-binlog-gtid: "3e11fa47-71ca-11e1-9e33-c80aa9429562:1-23"
relay-dir: "./relay_log"
meta-dir: "./dm_meta"
charset: "utf8mb4"
from:
  host: "127.0.0.1"
  port: 3307
  user: "root"
  password: "123456"
  max-allowed-packet: 67108864
  session:
    SQL_MODE: "ANSI_QUOTES"
  security:
    ssl-ca: "/path/to/ca.pem"
    ssl-cert: "/path/to/cert.pem"
    ssl-key: "/path/to/key.pem"
purge:
  interval: 1800
  expires: 24
  remain-space: 20
checker:
  check-enable: false
  backoff-rollback: "10m"
  backoff-max: "1h"
"#;

#[test]
fn test_decode_full_yaml() {
    let cfg = SourceConfig::from_yaml(FULL_YAML).unwrap();

    assert_eq!(cfg.source_id, "mysql-replica-01");
    assert_eq!(cfg.flavor, "mysql");
    assert_eq!(cfg.server_id, 101);
    assert!(cfg.enable_gtid);
    assert!(cfg.enable_relay);
    assert_eq!(cfg.relay_binlog_name, "mysql-bin.000003");
    assert_eq!(cfg.charset, "utf8mb4");
    assert_eq!(cfg.from.port, 3307);
    assert_eq!(cfg.from.max_allowed_packet, Some(67108864));
    assert_eq!(cfg.from.session.get("sql_mode").map(String::as_str), Some("ANSI_QUOTES"));
    assert_eq!(cfg.from.security.as_ref().unwrap().ssl_ca, "/path/to/ca.pem");
    assert_eq!(cfg.purge.interval, 1800);
    assert_eq!(cfg.purge.expires, 24);
    assert!(!cfg.checker.check_enable);
    assert_eq!(cfg.checker.backoff_max.as_std().as_secs(), 3600);
    cfg.verify().unwrap();
}

#[test]
fn test_absent_keys_take_defaults() {
    let cfg = SourceConfig::from_yaml("source-id: \"replica\"\n").unwrap();
    let defaults = SourceConfig::new();

    assert_eq!(cfg.relay_dir, defaults.relay_dir);
    assert_eq!(cfg.purge, defaults.purge);
    assert_eq!(cfg.checker, defaults.checker);
    assert_eq!(cfg.from, defaults.from);
    assert_eq!(cfg.server_id, 0);
    assert!(cfg.flavor.is_empty());
}

#[test]
fn test_yaml_rejects_unknown_keys() {
    let err = SourceConfig::from_yaml("source-id: \"replica\"\nunknown-key: 1\n").unwrap_err();
    assert!(matches!(err, DecodeError::Yaml(_)));
    assert!(err.to_string().contains("unknown-key"));

    let nested = "source-id: \"replica\"\nfrom:\n  hostname: \"db\"\n";
    assert!(SourceConfig::from_yaml(nested).is_err());

    let checker = "checker:\n  check-interval: \"5s\"\n";
    assert!(SourceConfig::from_yaml(checker).is_err());
}

#[test]
fn test_yaml_round_trip() {
    let cfg = SourceConfig::from_yaml(FULL_YAML).unwrap();
    let yaml = cfg.to_yaml().unwrap();
    let decoded = SourceConfig::from_yaml(&yaml).unwrap();
    assert_eq!(decoded, cfg);

    let sample = SourceConfig::from_yaml(SAMPLE_CONFIG).unwrap();
    let decoded = SourceConfig::decode(
        ConfigFormat::Yaml,
        &sample.encode(ConfigFormat::Yaml).unwrap(),
    )
    .unwrap();
    assert_eq!(decoded, sample);
}

#[test]
fn test_toml_round_trip() {
    let cfg = SourceConfig::from_yaml(FULL_YAML).unwrap();
    let toml = cfg.to_toml().unwrap();
    let decoded = SourceConfig::from_toml(&toml).unwrap();
    assert_eq!(decoded, cfg);
}

#[test]
fn test_toml_reports_all_undecoded_items() {
    let content = r#"
source-id = "replica"
bogus = 1
another = "x"

[from]
host = "127.0.0.1"
hostname = "db"

[checker]
check-interval = "5s"
"#;
    let err = SourceConfig::from_toml(content).unwrap_err();
    match err {
        DecodeError::UndecodedItems(items) => {
            assert_eq!(items, "another,bogus,checker.check-interval,from.hostname");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_toml_syntax_and_type_errors() {
    assert!(matches!(
        SourceConfig::from_toml("source-id = "),
        Err(DecodeError::Toml(_))
    ));
    assert!(matches!(
        SourceConfig::from_toml("server-id = \"not a number\""),
        Err(DecodeError::Toml(_))
    ));
}

#[test]
fn test_toml_accepts_compound_checker_durations() {
    let content = r#"
source-id = "replica"

[checker]
check-enable = true
backoff-rollback = "5m0s"
backoff-max = "1h30m0s"
"#;
    let cfg = SourceConfig::from_toml(content).unwrap();
    assert_eq!(cfg.checker.backoff_rollback.as_std().as_secs(), 300);
    assert_eq!(cfg.checker.backoff_max.as_std().as_secs(), 5400);
}

#[test]
fn test_oversized_duration_is_a_decode_error() {
    let yaml = "source-id: \"r\"\nchecker:\n  backoff-max: \"5124095576030432h\"\n";
    assert!(matches!(
        SourceConfig::from_yaml(yaml),
        Err(DecodeError::Yaml(_))
    ));

    let toml = "source-id = \"r\"\n\n[checker]\nbackoff-rollback = \"5124095576030432h\"\n";
    assert!(matches!(
        SourceConfig::from_toml(toml),
        Err(DecodeError::Toml(_))
    ));
}

#[test]
fn test_legacy_tracer_is_read_but_not_emitted() {
    let yaml = "source-id: \"replica\"\ntracer:\n  enable: true\n  source: \"worker-1\"\n";
    let cfg = SourceConfig::from_yaml(yaml).unwrap();
    assert!(cfg.legacy_tracer.is_set());

    assert!(!cfg.to_json_display().unwrap().contains("tracer"));
    assert!(!cfg.to_yaml().unwrap().contains("tracer"));
    assert!(!cfg.to_toml().unwrap().contains("tracer"));

    let toml = "source-id = \"replica\"\n\n[tracer]\nenable = true\n";
    let cfg = SourceConfig::from_toml(toml).unwrap();
    assert!(cfg.legacy_tracer.is_set());
}

#[test]
fn test_json_display_uses_wire_names() {
    let cfg = SourceConfig::from_yaml(FULL_YAML).unwrap();
    let json: serde_json::Value = serde_json::from_str(&cfg.to_string()).unwrap();

    assert_eq!(json["source-id"], "mysql-replica-01");
    assert_eq!(json["server-id"], 101);
    assert_eq!(json["enable-gtid"], true);
    assert_eq!(json["from"]["host"], "127.0.0.1");
}

#[test]
fn test_serialized_forms_never_contain_decrypted_password() {
    let mut cfg = SourceConfig::from_yaml(FULL_YAML).unwrap();
    cfg.from.password = encrypt("s3cr3t-passw0rd").unwrap();
    let stored = cfg.from.password.clone();

    for format in [ConfigFormat::Yaml, ConfigFormat::Toml, ConfigFormat::Json] {
        let out = cfg.encode(format).unwrap();
        assert!(!out.contains("s3cr3t-passw0rd"), "{format} leaked the password");
    }
    assert!(cfg.to_yaml().unwrap().contains(&stored));

    let clone = cfg.decrypted_clone();
    assert_eq!(clone.from.password, "s3cr3t-passw0rd");
    assert_eq!(cfg.from.password, stored);
    assert_eq!(decrypt_or_plaintext(&stored), "s3cr3t-passw0rd");

    // the diagnostic form of the decrypted clone is masked too
    assert!(!clone.to_string().contains("s3cr3t-passw0rd"));
    assert!(!format!("{clone:?}").contains("s3cr3t-passw0rd"));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(FULL_YAML.as_bytes()).unwrap();

    let cfg = SourceConfig::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.source_id, "mysql-replica-01");
}

#[test]
fn test_load_from_missing_file() {
    let err = SourceConfig::load_from_file("/nonexistent/source.yaml").unwrap_err();
    assert!(matches!(err, DecodeError::ReadFile { .. }));
    assert!(err.to_string().contains("/nonexistent/source.yaml"));
}
