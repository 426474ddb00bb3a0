//! Source config for a MySQL/MariaDB replication source worker
//!
//! A [`SourceConfig`] describes one upstream database a worker tails the
//! binlog of. Its lifecycle:
//!
//! 1. built with static defaults ([`SourceConfig::new`])
//! 2. decoded from YAML (canonical) or TOML (legacy), see [`codec`]
//! 3. statically checked with [`SourceConfig::verify`]
//! 4. optionally completed against the live upstream by an [`Adjuster`]
//! 5. handed read-only to the replication engine together with the
//!    decrypted connection descriptor from [`SourceConfig::generate_db_config`]
//!
//! # Example
//!
//! ```rust,ignore
//! use source_config::{Adjuster, SourceConfig};
//!
//! let mut cfg = SourceConfig::load_from_file("source.yaml")?;
//! cfg.verify()?;
//! let probe = mysql_probe::MySqlProbe::connect(&cfg.generate_db_config())?;
//! Adjuster::new(&probe).adjust(&mut cfg).await?;
//! ```

pub mod adjust;
pub mod binlog;
pub mod checker;
pub mod codec;
pub mod credential;
pub mod db;
pub mod duration;
pub mod error;
pub mod gtid;
mod model;
mod verify;

pub use adjust::{
    Adjuster, RandomCandidates, ServerIdCandidates, UpstreamProbe, DEFAULT_BASE_SERVER_ID,
    DEFAULT_DISCOVERY_TIMEOUT, GTID_MODE_ON,
};
pub use checker::CheckerConfig;
pub use codec::{ConfigFormat, SAMPLE_CONFIG};
pub use db::{DbConfig, RawDbConfig, SecurityConfig};
pub use error::{
    DecodeError, DiscoveryError, DiscoveryStep, EncodeError, Error, Result, ValidationError,
};
pub use model::{
    Flavor, LegacyTracer, PurgeConfig, SourceConfig, MARIADB_FLAVOR, MAX_SOURCE_ID_LENGTH,
    MYSQL_FLAVOR,
};
