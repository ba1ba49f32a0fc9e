//! OS termination signals.

use std::fmt;

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Which termination signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupt,
    Terminate,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Interrupt => f.write_str("SIGINT"),
            Termination::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Shutdown notice broadcast to every worker.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// Wait for SIGINT or SIGTERM.
///
/// If a handler cannot be installed the corresponding branch never fires;
/// the failure is logged once.
pub async fn wait_for_termination() -> Termination {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => Some(term),
            Err(e) => {
                warn!(error = %e, "Cannot install SIGTERM handler");
                None
            }
        };
        let sigterm = async {
            match term.as_mut() {
                Some(term) => {
                    term.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = interrupt() => Termination::Interrupt,
            _ = sigterm => Termination::Terminate,
        }
    }

    #[cfg(not(unix))]
    {
        interrupt().await;
        Termination::Interrupt
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot install SIGINT handler");
        std::future::pending::<()>().await;
    }
}

/// Spawn the signal-waiting worker: the first termination signal is
/// broadcast as a [`ShutdownSignal`].
pub fn spawn_signal_forwarder(tx: broadcast::Sender<ShutdownSignal>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let signal = wait_for_termination().await;
        info!(%signal, "Termination signal received");
        let _ = tx.send(ShutdownSignal);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Interrupt.to_string(), "SIGINT");
        assert_eq!(Termination::Terminate.to_string(), "SIGTERM");
    }
}
