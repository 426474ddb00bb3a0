//! Operator tooling for replication source configs
//!
//! Wires the pieces of [`source_config`] into the steps an operator runs
//! before handing a config to a worker:
//!
//! - load a YAML or legacy TOML document and verify it
//! - complete unset `flavor` / `server-id` against the live upstream and
//!   check its GTID mode
//! - re-encode between formats
//!
//! # CLI Usage
//!
//! ```bash
//! dm-source check --config source.yaml
//! dm-source adjust --config source.yaml --discovery-timeout 10s --output completed.yaml
//! dm-source convert --config legacy.toml --from toml --to yaml
//! dm-source encrypt 'p@ssw0rd'
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mysql_probe::MySqlProbe;
use source_config::duration::Duration;
use source_config::{Adjuster, ConfigFormat, SourceConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Format of a config document on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    #[value(alias = "yml")]
    Yaml,
    Toml,
    /// Output only
    Json,
}

impl From<FormatArg> for ConfigFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Yaml => ConfigFormat::Yaml,
            FormatArg::Toml => ConfigFormat::Toml,
            FormatArg::Json => ConfigFormat::Json,
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ConfigOpts {
    /// Path to the source config
    #[arg(long, env = "DM_SOURCE_CONFIG")]
    pub config: PathBuf,

    /// Format of the config file
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: FormatArg,
}

#[derive(Parser, Clone, Debug)]
pub struct DiscoveryOpts {
    /// Bound on the whole discovery sequence (e.g. "30s", "1m")
    #[arg(long, default_value = "30s", env = "DM_SOURCE_DISCOVERY_TIMEOUT")]
    pub discovery_timeout: Duration,
}

impl Default for DiscoveryOpts {
    fn default() -> Self {
        Self {
            discovery_timeout: source_config::DEFAULT_DISCOVERY_TIMEOUT.into(),
        }
    }
}

/// Read and decode a config file in `format`.
pub fn load_config(path: &Path, format: ConfigFormat) -> anyhow::Result<SourceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source config from {}", path.display()))?;
    SourceConfig::decode(format, &content)
        .with_context(|| format!("Failed to decode source config {}", path.display()))
}

/// Load and verify a config.
pub fn check(opts: &ConfigOpts) -> anyhow::Result<SourceConfig> {
    let cfg = load_config(&opts.config, opts.format.into())?;
    cfg.verify()
        .with_context(|| format!("Invalid source config {}", opts.config.display()))?;
    info!(source_id = %cfg.source_id, "Source config is valid");
    Ok(cfg)
}

/// Pretty JSON rendering of a config with the password masked.
pub fn render_json(cfg: &SourceConfig) -> anyhow::Result<String> {
    let value: serde_json::Value = serde_json::from_str(&cfg.to_json_display()?)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Complete `cfg` against its upstream.
///
/// The probe connects with the decrypted descriptor; `cfg` itself keeps the
/// password as stored.
pub async fn adjust(mut cfg: SourceConfig, opts: &DiscoveryOpts) -> anyhow::Result<SourceConfig> {
    let db = cfg.generate_db_config();
    info!(
        source_id = %cfg.source_id,
        upstream = %db.address(),
        timeout = %opts.discovery_timeout,
        "Running upstream discovery"
    );

    let probe = MySqlProbe::connect(&db).context("Failed to set up upstream connection")?;
    let result = Adjuster::new(&probe)
        .with_timeout(opts.discovery_timeout.as_std())
        .adjust(&mut cfg)
        .await;

    if let Err(e) = probe.disconnect().await {
        warn!(error = %e, "Failed to close upstream connections");
    }

    result.with_context(|| format!("Discovery failed for source {}", cfg.source_id))?;
    info!(
        source_id = %cfg.source_id,
        flavor = %cfg.flavor,
        server_id = cfg.server_id,
        "Source config completed"
    );
    Ok(cfg)
}

/// Re-encode `content` from one format to another. The result ends with
/// exactly one newline.
pub fn convert(content: &str, from: ConfigFormat, to: ConfigFormat) -> anyhow::Result<String> {
    let cfg = SourceConfig::decode(from, content)
        .with_context(|| format!("Failed to decode {from} config"))?;
    let mut out = cfg
        .encode(to)
        .with_context(|| format!("Failed to encode config as {to}"))?;
    out.truncate(out.trim_end_matches('\n').len());
    out.push('\n');
    Ok(out)
}
