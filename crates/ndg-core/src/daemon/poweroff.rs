//! Concurrent, timeout-bounded service stops ahead of host power-off.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ndg_config::PowerOffConfig;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::collab::SystemControl;
use crate::comm::payload::{PowerOffProgress, ServiceProgress};

/// Upper bound on the slack given to a stop command past its own timeout.
const MAX_STOP_GRACE: Duration = Duration::from_secs(5);

/// How long to wait for a stop command that was told to give up after
/// `timeout`. The command gets to report its own timeout before ours fires.
fn stop_deadline(timeout: Duration) -> Duration {
    timeout + (timeout / 10).min(MAX_STOP_GRACE)
}

/// Classify a finished stop. A command that fails once its timeout has
/// passed gave up waiting (as `sv -w` does), so that counts as a timeout.
fn stop_outcome<E: fmt::Display>(
    result: Result<(), E>,
    elapsed: Duration,
    timeout: Duration,
) -> StopOutcome {
    match result {
        Ok(()) => StopOutcome::Stopped,
        Err(_) if elapsed >= timeout => StopOutcome::TimedOut,
        Err(e) => StopOutcome::Error(e.to_string()),
    }
}

/// One service to stop and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStop {
    pub name: String,
    pub timeout: Duration,
}

/// How a single service stop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    TimedOut,
    Error(String),
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped => f.write_str("stopped"),
            StopOutcome::TimedOut => f.write_str("timed out"),
            StopOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// A service name paired with its stop outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResult {
    pub name: String,
    pub outcome: StopOutcome,
}

/// The ordered list of services stopped during power-off.
///
/// All stops are issued at once and every one is awaited to its outcome;
/// a failure or timeout never cancels the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStopPlan {
    entries: Vec<ServiceStop>,
}

impl ServiceStopPlan {
    pub fn new(entries: Vec<ServiceStop>) -> Self {
        Self { entries }
    }

    pub fn from_config(config: &PowerOffConfig) -> Self {
        Self::new(
            config
                .services
                .iter()
                .map(|s| ServiceStop {
                    name: s.name.clone(),
                    timeout: s.timeout(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ServiceStop] {
        &self.entries
    }

    /// Progress with every service still pending.
    pub fn pending_progress(&self) -> PowerOffProgress {
        PowerOffProgress {
            services: self
                .entries
                .iter()
                .map(|e| ServiceProgress {
                    name: e.name.clone(),
                    stopped: false,
                    err: None,
                })
                .collect(),
        }
    }

    /// Stop every service concurrently and wait for all outcomes.
    ///
    /// `report` is called with the initial (all pending) progress and again
    /// after each outcome. Results come back in plan order.
    pub async fn execute<F, Fut>(
        &self,
        system: Arc<dyn SystemControl>,
        mut report: F,
    ) -> Vec<ServiceResult>
    where
        F: FnMut(PowerOffProgress) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut progress = self.pending_progress();
        report(progress.clone()).await;

        let mut stops = JoinSet::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            let system = Arc::clone(&system);
            let name = entry.name.clone();
            let timeout = entry.timeout;
            info!(service = %name, ?timeout, "Stopping service");

            stops.spawn(async move {
                let started = Instant::now();
                let stop = system.stop_service(&name, timeout);
                let outcome = match tokio::time::timeout(stop_deadline(timeout), stop).await {
                    Ok(result) => stop_outcome(result, started.elapsed(), timeout),
                    Err(_) => StopOutcome::TimedOut,
                };
                (idx, outcome)
            });
        }

        let mut outcomes: Vec<Option<StopOutcome>> = vec![None; self.entries.len()];
        while let Some(joined) = stops.join_next().await {
            let (idx, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(error = %e, "Service stop task failed");
                    continue;
                }
            };

            let name = &self.entries[idx].name;
            match &outcome {
                StopOutcome::Stopped => info!(service = %name, "Service stopped"),
                other => warn!(service = %name, outcome = %other, "Service did not stop cleanly"),
            }

            let entry = &mut progress.services[idx];
            entry.stopped = outcome == StopOutcome::Stopped;
            entry.err = match &outcome {
                StopOutcome::Stopped => None,
                other => Some(other.to_string()),
            };
            outcomes[idx] = Some(outcome);
            report(progress.clone()).await;
        }

        self.entries
            .iter()
            .zip(outcomes)
            .map(|(entry, outcome)| ServiceResult {
                name: entry.name.clone(),
                outcome: outcome
                    .unwrap_or_else(|| StopOutcome::Error("stop task failed".to_string())),
            })
            .collect()
    }
}
