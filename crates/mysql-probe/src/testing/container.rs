//! Docker container running a GTID-enabled MySQL upstream

use anyhow::{Context, Result};
use source_config::DbConfig;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ROOT_PASSWORD: &str = "testpass";

pub struct MySQLContainer {
    pub container_name: String,
    pub host_port: u16,
    pub image_name: String,
    /// Extra `mysqld` flags
    pub server_args: Vec<String>,
}

impl MySQLContainer {
    /// MySQL 8 with GTID replication turned on.
    pub fn new(container_name: &str, host_port: u16) -> Self {
        Self {
            container_name: container_name.to_string(),
            host_port,
            image_name: "mysql:8.0".to_string(),
            server_args: vec![
                "--server-id=1".to_string(),
                "--log-bin=mysql-bin".to_string(),
                "--gtid-mode=ON".to_string(),
                "--enforce-gtid-consistency=ON".to_string(),
            ],
        }
    }

    /// Same image with GTID replication left off.
    pub fn without_gtid(container_name: &str, host_port: u16) -> Self {
        let mut container = Self::new(container_name, host_port);
        container
            .server_args
            .retain(|arg| !arg.starts_with("--gtid-mode") && !arg.starts_with("--enforce-gtid"));
        container
    }

    /// Connection descriptor for the container's root account.
    pub fn db_config(&self) -> DbConfig {
        let mut db = DbConfig::default();
        db.host = "127.0.0.1".to_string();
        db.port = self.host_port;
        db.user = "root".to_string();
        db.password = ROOT_PASSWORD.to_string();
        db
    }

    fn remove_existing(&self) {
        for action in ["stop", "rm"] {
            let _ = Command::new("docker")
                .args([action, &self.container_name])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }

    pub fn start(&self) -> Result<()> {
        info!("Starting MySQL container: {}", self.container_name);
        self.remove_existing();

        let root_password = format!("MYSQL_ROOT_PASSWORD={ROOT_PASSWORD}");
        let port = format!("{}:3306", self.host_port);
        let mut args = vec![
            "run",
            "--name",
            &self.container_name,
            "-e",
            &root_password,
            "-p",
            &port,
            "-d",
            &self.image_name,
        ];
        args.extend(self.server_args.iter().map(String::as_str));

        let output = Command::new("docker")
            .args(&args)
            .output()
            .context("Failed to start Docker container")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to start container: {stderr}");
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Started container: {}", container_id);
        Ok(())
    }

    pub async fn wait_until_ready(&self, timeout_secs: u64) -> Result<()> {
        info!("Waiting for MySQL to be ready...");

        let start = Instant::now();
        let timeout = Duration::from_secs(timeout_secs);

        while start.elapsed() < timeout {
            match self.test_connection().await {
                Ok(_) => {
                    info!("MySQL is ready!");
                    return Ok(());
                }
                Err(e) => {
                    debug!("Connection attempt failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(1000)).await;
                }
            }
        }

        anyhow::bail!("MySQL did not become ready within {timeout_secs} seconds")
    }

    async fn test_connection(&self) -> Result<()> {
        use mysql_async::prelude::*;

        let pool = crate::new_mysql_pool(&self.db_config())?;
        let mut conn = pool.get_conn().await.context("Failed to get connection")?;
        let _: Option<i32> = conn
            .query_first("SELECT 1")
            .await
            .context("Failed to execute test query")?;

        drop(conn);
        pool.disconnect()
            .await
            .context("Failed to disconnect pool")?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        info!("Stopping container: {}", self.container_name);

        for action in ["stop", "rm"] {
            let output = Command::new("docker")
                .args([action, &self.container_name])
                .output()
                .with_context(|| format!("Failed to {action} container"))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!("docker {} failed (container may not exist): {}", action, stderr);
            }
        }

        info!("Container stopped and removed");
        Ok(())
    }
}

impl Drop for MySQLContainer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
