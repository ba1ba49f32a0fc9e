//! The supervised UI child process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ndg_config::DaemonConfig;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::DaemonError;

const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running UI process whose stdin/stdout are the protocol pipe.
///
/// stderr is inherited so the UI's logs land next to the daemon's. The
/// child is killed if this handle is dropped.
#[derive(Debug)]
pub struct UiProcess {
    child: Child,
}

impl UiProcess {
    pub fn spawn(config: &DaemonConfig) -> Result<Self, DaemonError> {
        let child = Command::new(&config.ui_path)
            .args(&config.ui_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::Spawn {
                path: config.ui_path.clone(),
                source,
            })?;

        info!(path = %config.ui_path, pid = ?child.id(), "UI process spawned");
        Ok(Self { child })
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the UI and reap it. Best effort: failures are logged.
    pub async fn terminate(mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "UI process already exited");
                return Some(status);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cannot query UI process state"),
        }

        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "Failed to kill UI process");
        }
        match tokio::time::timeout(REAP_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "UI process terminated");
                Some(status)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to reap UI process");
                None
            }
            Err(_) => {
                warn!(timeout = ?REAP_TIMEOUT, "UI process did not exit");
                None
            }
        }
    }
}
