//! # Veyor Agent
//!
//! Conveyance-station downtime monitor.
//!
//! Polls a dashboard feed for package scans at induct stations, derives
//! categorized downtime events from consecutive scan gaps, persists them to
//! SQLite, and reports per-shift totals and threshold alerts to a webhook.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veyor_agent::monitor::Monitor;
use veyor_config::{ConfigLoad, ConfigLoader};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "veyor-agent")]
#[command(about = "Conveyance-station downtime monitoring agent")]
struct Cli {
    /// Configuration file path (defaults to veyor.toml, then built-in
    /// defaults)
    #[arg(long, global = true, env = "VEYOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run continuous shift-gated monitoring (default)
    Run,
    /// Run a single scrape-and-analyze cycle and exit
    Once,
    /// Exercise every component (webhook, dashboard, store, engine) and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad { config, warnings } =
        loader.load().context("failed to load configuration")?;
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!("{} ({hint})", warning.message),
            None => warn!("{}", warning.message),
        }
    }
    if let Some(path) = &config.metadata.source_path {
        info!(path = %path.display(), "configuration loaded");
    }

    let mut monitor = Monitor::new(config)
        .await
        .context("failed to initialize monitor")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => monitor.run().await,
        Command::Once => {
            info!("running single cycle");
            monitor.poll_cycle().await
        }
        Command::Check => monitor.check().await,
    }
}
