//! Command-line interface for dm-source
//!
//! # Usage Examples
//!
//! ```bash
//! # Verify a config and print its JSON rendering
//! dm-source check --config source.yaml
//!
//! # Fill flavor and server-id from the upstream and write the result
//! dm-source adjust --config source.yaml --output completed.yaml
//!
//! # Upgrade a legacy TOML config
//! dm-source convert --config source.toml --from toml --to yaml
//!
//! # Encrypt a password for the `from.password` field
//! dm-source encrypt 'p@ssw0rd'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use dm_source::{ConfigOpts, DiscoveryOpts, FormatArg};
use source_config::SAMPLE_CONFIG;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dm-source")]
#[command(about = "Load, validate and auto-complete replication source configs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and verify a source config
    Check {
        #[command(flatten)]
        config: ConfigOpts,
    },

    /// Complete a source config against its upstream database
    Adjust {
        #[command(flatten)]
        config: ConfigOpts,

        #[command(flatten)]
        discovery: DiscoveryOpts,

        /// Write the completed YAML here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Re-encode a source config in another format
    Convert {
        /// Path to the source config
        #[arg(long)]
        config: PathBuf,

        #[arg(long, value_enum)]
        from: FormatArg,

        #[arg(long, value_enum, default_value = "yaml")]
        to: FormatArg,
    },

    /// Encrypt a plaintext password
    Encrypt { plaintext: String },

    /// Print the sample source config
    Sample,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let cfg = dm_source::check(&config)?;
            println!("{}", dm_source::render_json(&cfg)?);
        }
        Commands::Adjust {
            config,
            discovery,
            output,
        } => {
            let cfg = dm_source::check(&config)?;
            let cfg = dm_source::adjust(cfg, &discovery).await?;
            let yaml = cfg.to_yaml()?;
            match output {
                Some(path) => std::fs::write(&path, yaml)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{yaml}"),
            }
        }
        Commands::Convert { config, from, to } => {
            let content = std::fs::read_to_string(&config)
                .with_context(|| format!("Failed to read {}", config.display()))?;
            print!("{}", dm_source::convert(&content, from.into(), to.into())?);
        }
        Commands::Encrypt { plaintext } => {
            println!("{}", source_config::credential::encrypt(&plaintext)?);
        }
        Commands::Sample => print!("{SAMPLE_CONFIG}"),
    }

    Ok(())
}
