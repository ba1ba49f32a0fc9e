//! Periodic status reports pushed to the UI.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::{Notify, broadcast};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::collab::{CollabError, Collaborators};
use crate::comm::Message;
use crate::comm::payload::{LightningError, LightningErrorCode};
use crate::signal::ShutdownSignal;
use crate::transport::FrameWriter;

/// Poller state shared with the dispatch loop.
#[derive(Debug, Default)]
pub(crate) struct PollerState {
    /// The UI reported `standby`: chain and lightning polls are skipped.
    standby: AtomicBool,
    /// A seed was already offered for the current uninitialized wallet.
    genseed_offered: AtomicBool,
    wake: Notify,
}

impl PollerState {
    pub(crate) fn set_standby(&self, standby: bool) {
        self.standby.store(standby, Ordering::Release);
        if !standby {
            self.poll_now();
        }
    }

    pub(crate) fn is_standby(&self) -> bool {
        self.standby.load(Ordering::Acquire)
    }

    /// Run the next poll without waiting for the interval.
    pub(crate) fn poll_now(&self) {
        self.wake.notify_one();
    }

    /// Allow a new seed to be offered, e.g. after a wallet reset.
    pub(crate) fn rearm_genseed(&self) {
        self.genseed_offered.store(false, Ordering::Release);
    }
}

pub(crate) struct ReportPoller<W> {
    pub(crate) collab: Collaborators,
    pub(crate) writer: FrameWriter<W>,
    pub(crate) state: Arc<PollerState>,
    pub(crate) interval: Duration,
}

/// Await `fut` unless shutdown arrives first.
async fn until_shutdown<T>(
    shutdown: &mut broadcast::Receiver<ShutdownSignal>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        _ = shutdown.recv() => None,
        out = fut => Some(out),
    }
}

impl<W: AsyncWrite + Unpin + Send + 'static> ReportPoller<W> {
    pub(crate) async fn run(self, mut shutdown: broadcast::Receiver<ShutdownSignal>) {
        let Some(network) =
            until_shutdown(&mut shutdown, self.collab.wifi.network_report(false)).await
        else {
            return;
        };
        match network {
            Ok(report) => self.send(Message::NetworkReport(report)).await,
            Err(e) => warn_collab("network_report", &e),
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
                _ = self.state.wake.notified() => {}
            }
            if self.state.is_standby() {
                continue;
            }
            if self.poll_once(&mut shutdown).await.is_none() {
                break;
            }
        }
        debug!("Report poller stopped");
    }

    /// One round of chain and lightning reports. `None` if shutdown
    /// interrupted it.
    async fn poll_once(&self, shutdown: &mut broadcast::Receiver<ShutdownSignal>) -> Option<()> {
        match until_shutdown(shutdown, self.collab.chain.onchain_report()).await? {
            Ok(report) => self.send(Message::OnchainReport(report)).await,
            Err(e) => warn_collab("onchain_report", &e),
        }

        match until_shutdown(shutdown, self.collab.lightning.report()).await? {
            Ok(report) => {
                self.send(Message::LightningReport(report)).await;
            }
            Err(e) => {
                let code = e.lightning_code();
                debug!(error = %e, ?code, "No lightning report");
                self.send(Message::LightningError(LightningError::new(code)))
                    .await;
                if code == LightningErrorCode::Uninitialized {
                    self.offer_seed(shutdown).await?;
                }
            }
        }
        Some(())
    }

    async fn offer_seed(&self, shutdown: &mut broadcast::Receiver<ShutdownSignal>) -> Option<()> {
        if self.state.genseed_offered.swap(true, Ordering::AcqRel) {
            return Some(());
        }
        match until_shutdown(shutdown, self.collab.lightning.genseed()).await? {
            Ok(seed) => {
                info!("Offering new wallet seed");
                self.send(Message::LightningGenseedResult(seed)).await;
            }
            Err(e) => {
                self.state.rearm_genseed();
                warn_collab("genseed", &e);
            }
        }
        Some(())
    }

    async fn send(&self, msg: Message) {
        if let Err(e) = self.writer.write(&msg).await {
            warn!(tag = %msg.tag(), error = %e, "Failed to push report");
        }
    }
}

/// Log a collaborator failure; unavailable collaborators are expected on
/// devices without that subsystem and only logged at debug.
pub(crate) fn warn_collab(op: &str, e: &CollabError) {
    match e {
        CollabError::Unavailable(_) => debug!(op, error = %e, "Collaborator unavailable"),
        _ => warn!(op, error = %e, "Collaborator request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standby_flag() {
        let state = PollerState::default();
        assert!(!state.is_standby());
        state.set_standby(true);
        assert!(state.is_standby());
        state.set_standby(false);
        assert!(!state.is_standby());
    }

    #[tokio::test]
    async fn test_wakeup_triggers_immediate_poll() {
        let state = PollerState::default();
        state.set_standby(true);
        state.set_standby(false);
        // The wake permit is stored, so the next wait returns at once.
        tokio::time::timeout(Duration::from_millis(50), state.wake.notified())
            .await
            .unwrap();
    }
}
