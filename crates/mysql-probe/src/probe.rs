//! [`UpstreamProbe`] backed by a live MySQL/MariaDB connection.

use crate::client::new_mysql_pool;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Pool, Row};
use source_config::{DbConfig, Flavor, UpstreamProbe};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Used when the connection descriptor carries no read timeout.
const FALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MySqlProbe {
    pool: Pool,
    read_timeout: Duration,
}

impl MySqlProbe {
    /// Probe the upstream described by `db`. The password must already be decrypted.
    pub fn connect(db: &DbConfig) -> Result<Self> {
        let pool = new_mysql_pool(db)?;
        Ok(Self {
            pool,
            read_timeout: db
                .raw
                .read_timeout
                .map(|timeout| timeout.as_std())
                .unwrap_or(FALLBACK_READ_TIMEOUT),
        })
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .context("Failed to disconnect MySQL pool")
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.read_timeout, fut)
            .await
            .map_err(|_| anyhow!("{what} did not complete within {:?}", self.read_timeout))?
    }

    async fn global_variable(&self, name: &str) -> Result<Option<String>> {
        self.bounded(name, async {
            let mut conn = self.pool.get_conn().await?;
            let row: Option<(String, String)> = conn
                .query_first(format!("SHOW GLOBAL VARIABLES LIKE '{name}'"))
                .await
                .with_context(|| format!("Failed to read global variable {name}"))?;
            Ok(row.map(|(_, value)| value))
        })
        .await
    }

    async fn replica_server_ids(&self) -> Result<Vec<u32>> {
        self.bounded("SHOW SLAVE HOSTS", async {
            let mut conn = self.pool.get_conn().await?;
            // MySQL 8.4 dropped the SLAVE spelling
            let rows: Vec<Row> = match conn.query("SHOW SLAVE HOSTS").await {
                Ok(rows) => rows,
                Err(e) => {
                    debug!(error = %e, "SHOW SLAVE HOSTS failed, retrying with SHOW REPLICAS");
                    conn.query("SHOW REPLICAS")
                        .await
                        .context("Failed to list connected replicas")?
                }
            };
            rows.iter()
                .map(|row| {
                    row.get_opt::<u32, usize>(0)
                        .ok_or_else(|| anyhow!("Replica row has no server id column"))?
                        .context("Invalid replica server id")
                })
                .collect()
        })
        .await
    }
}

/// Flavor implied by the upstream's `version` variable.
pub fn flavor_from_version(version: &str) -> Flavor {
    if version.to_uppercase().contains("MARIADB") {
        Flavor::Mariadb
    } else {
        Flavor::Mysql
    }
}

#[async_trait]
impl UpstreamProbe for MySqlProbe {
    async fn reported_dialect(&self) -> Result<String> {
        let version = self
            .global_variable("version")
            .await?
            .ok_or_else(|| anyhow!("Upstream did not report a version"))?;
        let flavor = flavor_from_version(&version);
        debug!(%version, %flavor, "Upstream version");
        Ok(flavor.to_string())
    }

    async fn connected_server_ids(&self) -> Result<HashSet<u32>> {
        let mut ids: HashSet<u32> = self.replica_server_ids().await?.into_iter().collect();

        let own = self
            .global_variable("server_id")
            .await?
            .ok_or_else(|| anyhow!("Upstream did not report its server_id"))?;
        ids.insert(
            own.parse()
                .with_context(|| format!("Invalid upstream server_id: {own}"))?,
        );

        debug!(count = ids.len(), "Server ids in use upstream");
        Ok(ids)
    }

    async fn gtid_mode_status(&self) -> Result<String> {
        // MariaDB and old MySQL servers have no GTID_MODE variable
        Ok(self.global_variable("GTID_MODE").await?.unwrap_or_default())
    }
}
