#![deny(unsafe_code)]

//! ngui: the node's display process.
//!
//! Spawned by `nd` with stdin/stdout as the message pipe. Draws on the
//! controlling terminal when there is one, otherwise logs what it would show.

mod app;
mod headless;
mod keymap;
mod panels;
mod terminal;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ndg_config::{AppConfig, UiConfig};
use ndg_core::transport::StdioTransport;
use ndg_core::ui::{Screen, UiCommand, UiRuntime, command_channel};
use ndg_core::{Transport, logging, signal};
use tokio::sync::mpsc;
use tracing::info;

use crate::headless::HeadlessScreen;
use crate::terminal::TerminalScreen;

/// Entries kept for the logs panel.
const LOG_CAPACITY: usize = 2_000;

/// How long runtime shutdown waits for blocking tasks. A stdin read parked
/// in the blocking pool never finishes on its own.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Node display, driven by nd over stdin/stdout.
#[derive(Parser)]
#[command(name = "ngui", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "ndg.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Terminal to draw on.
    #[arg(long, default_value = "/dev/tty")]
    tty: PathBuf,

    /// Log updates instead of drawing them.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_or_default(&cli.config)
        .await
        .with_context(|| format!("invalid configuration '{}'", cli.config.display()))?;
    let directive = logging::filter_directive(cli.verbose, &config.logging.level);
    let transport = Transport::stdio().context("cannot bind stdio pipe")?;
    let (commands_tx, commands_rx) = command_channel();

    if !cli.headless && tty_available(&cli.tty) {
        let logs = logging::init_collected(&directive, LOG_CAPACITY)?;
        let screen = TerminalScreen::open(&cli.tty, logs, commands_tx)
            .with_context(|| format!("cannot open terminal '{}'", cli.tty.display()))?;
        serve(&config.ui, screen, transport, commands_rx).await;
    } else {
        logging::init(&directive)?;
        drop(commands_tx);
        serve(&config.ui, HeadlessScreen::new(), transport, commands_rx).await;
    }
    Ok(())
}

fn tty_available(tty: &Path) -> bool {
    OpenOptions::new().read(true).write(true).open(tty).is_ok()
}

async fn serve<S: Screen + 'static>(
    config: &UiConfig,
    screen: S,
    transport: StdioTransport,
    commands: mpsc::Receiver<UiCommand>,
) {
    info!(
        version = %ndg_core::build_info::version_string(),
        "UI starting"
    );
    let runtime = UiRuntime::new(config, screen, transport, commands);
    let signals = signal::spawn_signal_forwarder(runtime.shutdown_handle());
    runtime.run().await;
    signals.abort();
    info!("UI stopped");
}
