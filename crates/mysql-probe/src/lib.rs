//! MySQL/MariaDB implementation of the upstream queries used to complete a
//! source config.
//!
//! ```rust,ignore
//! let db = cfg.generate_db_config();
//! let probe = MySqlProbe::connect(&db)?;
//! Adjuster::new(&probe).adjust(&mut cfg).await?;
//! probe.disconnect().await?;
//! ```

mod client;
mod probe;
pub mod testing;

pub use client::new_mysql_pool;
pub use probe::{flavor_from_version, MySqlProbe};
