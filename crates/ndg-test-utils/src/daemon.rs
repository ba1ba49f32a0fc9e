//! Daemon test helpers.
//!
//! Helpers for starting a [`Daemon`] over an in-memory pipe with fake
//! collaborators and a temporary config file.

use std::path::PathBuf;

use ndg_config::AppConfig;
use ndg_core::daemon::DaemonState;
use ndg_core::signal::ShutdownSignal;
use ndg_core::{Daemon, DaemonError, StopReport};
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::collab::Fakes;
use crate::pipe::{PipeEnd, pipe_pair};

/// A daemon built from a temp config file, not yet started.
///
/// The temp directory is deleted automatically when this value is dropped,
/// guaranteeing cleanup even on panic.
pub struct TestDaemon {
    pub daemon: Daemon,
    pub fakes: Fakes,
    pub config_path: PathBuf,
    _temp_dir: TempDir,
}

/// A daemon serving one end of a pipe in a background task.
pub struct RunningDaemon {
    /// The UI's end of the pipe.
    pub ui: PipeEnd,
    pub fakes: Fakes,
    pub state: watch::Receiver<DaemonState>,
    shutdown: broadcast::Sender<ShutdownSignal>,
    task: JoinHandle<Result<StopReport, DaemonError>>,
}

impl TestDaemon {
    /// Create a daemon backed by a temporary config file containing the given
    /// TOML string.
    pub async fn with_toml(toml_content: &str, fakes: Fakes) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("ndg.toml");
        tokio::fs::write(&config_path, toml_content)
            .await
            .expect("failed to write test config");

        let config = AppConfig::load(&config_path)
            .await
            .expect("failed to parse test config");

        Self {
            daemon: Daemon::new(config, fakes.collaborators()),
            fakes,
            config_path,
            _temp_dir: temp_dir,
        }
    }

    /// Default config and default fakes.
    pub async fn default_config() -> Self {
        Self::with_toml("", Fakes::new()).await
    }

    /// Serve the daemon over a fresh in-memory pipe.
    pub fn start(self) -> RunningDaemon {
        let (nd, ui) = pipe_pair();
        let state = self.daemon.subscribe_state();
        let shutdown = self.daemon.shutdown_handle();
        let task = tokio::spawn(self.daemon.serve(nd, None));
        RunningDaemon {
            ui,
            fakes: self.fakes,
            state,
            shutdown,
            task,
        }
    }
}

impl RunningDaemon {
    /// Ask the daemon to stop as if it got SIGTERM.
    pub fn terminate(&self) {
        let _ = self.shutdown.send(ShutdownSignal);
    }

    /// Wait for the daemon to finish.
    pub async fn join(&mut self) -> Result<StopReport, DaemonError> {
        tokio::time::timeout(std::time::Duration::from_secs(10), &mut self.task)
            .await
            .expect("daemon did not stop")
            .expect("daemon task panicked")
    }
}
