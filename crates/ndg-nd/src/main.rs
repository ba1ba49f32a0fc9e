#![deny(unsafe_code)]

//! nd: the node daemon.
//!
//! Spawns the UI process, serves it over its stdio pipe and carries out the
//! actions it asks for until SIGINT/SIGTERM, end-of-stream, or power-off.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndg_config::AppConfig;
use ndg_core::daemon::{Daemon, StopOutcome, StopReport, default_collaborators};
use ndg_core::logging;
use tracing::{info, warn};

/// Node daemon: supervises the ngui display process.
#[derive(Parser)]
#[command(name = "nd", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "ndg.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (the default).
    Run,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .await
        .with_context(|| format!("invalid configuration '{}'", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            logging::init(&logging::filter_directive(cli.verbose, &config.logging.level))?;
            cmd_run(config).await
        }
        Commands::Config { show } => {
            println!("{}", render_config(&cli.config, &config, show)?);
            Ok(())
        }
    }
}

async fn cmd_run(config: AppConfig) -> Result<()> {
    let collab = default_collaborators(&config);
    let daemon = Daemon::new(config, collab);
    let report = daemon.run().await.context("daemon failed to start")?;
    log_stop_report(&report);
    Ok(())
}

fn log_stop_report(report: &StopReport) {
    for service in &report.services {
        match &service.outcome {
            StopOutcome::Stopped => info!(service = %service.name, "Service stopped"),
            outcome => warn!(service = %service.name, %outcome, "Service did not stop cleanly"),
        }
    }
    info!(
        reason = %report.reason,
        powered_off = report.powered_off,
        "Daemon exited"
    );
}

fn render_config(path: &Path, config: &AppConfig, show: bool) -> Result<String> {
    if show {
        toml::to_string_pretty(config).context("cannot render configuration")
    } else {
        Ok(format!("Configuration at '{}' is valid.", path.display()))
    }
}
