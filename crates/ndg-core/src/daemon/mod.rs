//! The daemon: supervises the UI process and serves its requests.
//!
//! ```text
//!  starting ──▶ running ──▶ stopping ──▶ stopped
//!     │            │            │
//!  spawn UI,   dispatch UI   [power-off: stop services,
//!  ping        requests,      report progress]
//!              push reports   kill UI, [power off host]
//! ```
//!
//! Only startup failures are fatal; once running, every failure is logged
//! and the daemon keeps going until a termination signal, end-of-stream from
//! the UI, or a `poweroff` request.

pub mod collab;
mod poller;
pub mod poweroff;
pub mod system;
pub mod ui_process;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ndg_config::AppConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::comm::payload::{LightningError, ScreenUnlockResult};
use crate::comm::{CommError, Message, ParsedMessage};
use crate::signal::{self, ShutdownSignal};
use crate::transport::{FrameReader, FrameWriter, Transport, TransportError};

pub use collab::{
    ChainNode, CollabError, Collaborators, LightningNode, SettingsStore, SystemControl,
    WifiControl,
};
use poller::{PollerState, ReportPoller, warn_collab};
pub use poweroff::{ServiceResult, ServiceStop, ServiceStopPlan, StopOutcome};
pub use system::{CommandSystemControl, ConfigSettings, default_collaborators};
pub use ui_process::UiProcess;

/// Supervisor lifecycle. Transitions only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl DaemonState {
    pub fn can_transition_to(self, target: DaemonState) -> bool {
        matches!(
            (self, target),
            (DaemonState::Starting, DaemonState::Running)
                | (DaemonState::Running, DaemonState::Stopping)
                | (DaemonState::Stopping, DaemonState::Stopped)
        )
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DaemonState::Starting => "starting",
            DaemonState::Running => "running",
            DaemonState::Stopping => "stopping",
            DaemonState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Why the daemon left `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal or [`Daemon::shutdown`].
    Terminated,
    /// The UI closed the pipe.
    EndOfStream,
    /// The UI requested power-off.
    PowerOff,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Terminated => "terminated",
            StopReason::EndOfStream => "end of stream",
            StopReason::PowerOff => "power-off",
        };
        f.write_str(s)
    }
}

/// What happened during `stopping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub reason: StopReason,
    /// Service stop outcomes, in plan order. Empty unless powering off.
    pub services: Vec<ServiceResult>,
    /// Whether the host power-off command succeeded.
    pub powered_off: bool,
}

/// Errors from the daemon runtime. All of them happen during startup.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("cannot spawn UI process '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot bind UI transport: {0}")]
    Transport(#[from] TransportError),

    #[error("initial ping to UI failed: {0}")]
    Ping(#[source] CommError),

    #[error("invalid daemon state transition {from} -> {to}")]
    State { from: DaemonState, to: DaemonState },
}

/// The daemon process.
pub struct Daemon {
    config: AppConfig,
    collab: Collaborators,
    state_tx: watch::Sender<DaemonState>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    shutdown_rx: broadcast::Receiver<ShutdownSignal>,
}

impl Daemon {
    pub fn new(config: AppConfig, collab: Collaborators) -> Self {
        let (state_tx, _) = watch::channel(DaemonState::Starting);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        Self {
            config,
            collab,
            state_tx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> DaemonState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<DaemonState> {
        self.state_tx.subscribe()
    }

    /// A handle that stops the daemon when sent to, usable after
    /// [`run`](Self::run) has taken ownership.
    pub fn shutdown_handle(&self) -> broadcast::Sender<ShutdownSignal> {
        self.shutdown_tx.clone()
    }

    /// Request a graceful stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    fn transition(&self, to: DaemonState) -> Result<(), DaemonError> {
        let from = self.state();
        if !from.can_transition_to(to) {
            return Err(DaemonError::State { from, to });
        }
        self.state_tx.send_replace(to);
        debug!(%from, %to, "Daemon state changed");
        Ok(())
    }

    /// Spawn the UI, bind its pipe and serve it until stopped. SIGINT and
    /// SIGTERM stop the daemon.
    pub async fn run(self) -> Result<StopReport, DaemonError> {
        info!(
            version = %crate::build_info::version_string(),
            ui = %self.config.daemon.ui_path,
            "Daemon starting"
        );
        let mut ui = UiProcess::spawn(&self.config.daemon)?;
        let transport = Transport::attach_child(ui.child_mut())?;
        let signals = signal::spawn_signal_forwarder(self.shutdown_tx.clone());

        let report = self.serve(transport, Some(ui)).await;
        signals.abort();
        report
    }

    /// Serve a UI on an already bound transport.
    ///
    /// `ui`, if given, is terminated during `stopping`.
    pub async fn serve<R, W>(
        mut self,
        transport: Transport<R, W>,
        ui: Option<UiProcess>,
    ) -> Result<StopReport, DaemonError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (mut reader, writer) = transport.split();

        writer
            .write(&Message::Ping)
            .await
            .map_err(DaemonError::Ping)?;
        self.transition(DaemonState::Running)?;
        info!("Daemon running");

        self.push_initial_settings(&writer).await;

        let poll_state = Arc::new(PollerState::default());
        let poller = tokio::spawn(
            ReportPoller {
                collab: self.collab.clone(),
                writer: writer.clone(),
                state: Arc::clone(&poll_state),
                interval: self.config.reports.poll_interval(),
            }
            .run(self.shutdown_tx.subscribe()),
        );

        let mut dispatcher = Dispatcher {
            collab: self.collab.clone(),
            writer: writer.clone(),
            poll_state,
            shutdown_tx: self.shutdown_tx.clone(),
            tasks: JoinSet::new(),
        };

        let reason = dispatcher.run(&mut reader, &mut self.shutdown_rx).await;

        info!(%reason, "Daemon stopping");
        self.transition(DaemonState::Stopping)?;
        let _ = self.shutdown_tx.send(ShutdownSignal);
        if let Err(e) = poller.await {
            warn!(error = %e, "Report poller failed");
        }
        dispatcher.drain().await;

        let report = if reason == StopReason::PowerOff {
            let services = self.stop_services(&writer).await;
            stop_ui(&writer, ui).await;
            let powered_off = match self.collab.system.power_off().await {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "Host power-off failed");
                    false
                }
            };
            StopReport {
                reason,
                services,
                powered_off,
            }
        } else {
            stop_ui(&writer, ui).await;
            StopReport {
                reason,
                services: Vec::new(),
                powered_off: false,
            }
        };

        self.transition(DaemonState::Stopped)?;
        info!("Daemon stopped");
        Ok(report)
    }

    async fn push_initial_settings<W>(&self, writer: &FrameWriter<W>)
    where
        W: AsyncWrite + Unpin,
    {
        let settings = match self.collab.settings.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn_collab("settings", &e);
                return;
            }
        };
        let locked = settings.slock_enabled;
        send(writer, &Message::Settings(settings)).await;
        if locked {
            send(writer, &Message::LockScreen).await;
        }
    }

    /// Run the configured stop plan, reporting progress to the UI.
    async fn stop_services<W>(&self, writer: &FrameWriter<W>) -> Vec<ServiceResult>
    where
        W: AsyncWrite + Unpin,
    {
        let plan = ServiceStopPlan::from_config(&self.config.poweroff);
        plan.execute(Arc::clone(&self.collab.system), |progress| async move {
            send(writer, &Message::PowerOffProgress(progress)).await;
        })
        .await
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &FrameWriter<W>, msg: &Message) {
    if let Err(e) = writer.write(msg).await {
        warn!(tag = %msg.tag(), error = %e, "Failed to send message to UI");
    }
}

/// Close our end of the pipe and reap the UI.
async fn stop_ui<W: AsyncWrite + Unpin>(writer: &FrameWriter<W>, ui: Option<UiProcess>) {
    if let Err(e) = writer.close().await {
        debug!(error = %e, "Closing UI pipe failed");
    }
    if let Some(ui) = ui {
        ui.terminate().await;
    }
}

enum Flow {
    Continue,
    PowerOff,
}

/// The read/dispatch worker.
struct Dispatcher<W> {
    collab: Collaborators,
    writer: FrameWriter<W>,
    poll_state: Arc<PollerState>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    /// In-flight collaborator requests.
    tasks: JoinSet<()>,
}

fn lightning_error(op: &str, e: &CollabError) -> Option<Message> {
    warn_collab(op, e);
    Some(Message::LightningError(LightningError::new(
        e.lightning_code(),
    )))
}

impl<W: AsyncWrite + Unpin + Send + 'static> Dispatcher<W> {
    /// Read and dispatch until the UI asks for power-off, closes the pipe or
    /// `shutdown` fires. Shutdown only interrupts the read, so a reply being
    /// written is always finished.
    async fn run<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut FrameReader<R>,
        shutdown: &mut broadcast::Receiver<ShutdownSignal>,
    ) -> StopReason {
        loop {
            while self.tasks.try_join_next().is_some() {}

            let read = tokio::select! {
                _ = shutdown.recv() => return StopReason::Terminated,
                read = reader.read() => read,
            };
            match read {
                Ok(msg) => {
                    if let Flow::PowerOff = self.dispatch(msg).await {
                        return StopReason::PowerOff;
                    }
                }
                Err(e) if e.is_end_of_stream() => {
                    info!("UI closed the pipe");
                    return StopReason::EndOfStream;
                }
                Err(e) => warn!(error = %e, "Failed to read message from UI"),
            }
        }
    }

    /// Wait for in-flight requests to finish their current write.
    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Request task failed");
            }
        }
    }

    /// Run a collaborator request in the background and send its reply, if
    /// any. Errors are logged.
    fn spawn_request<F>(&mut self, op: &'static str, request: F)
    where
        F: Future<Output = Result<Option<Message>, CollabError>> + Send + 'static,
    {
        let writer = self.writer.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        self.tasks.spawn(async move {
            let result = tokio::select! {
                _ = shutdown.recv() => return,
                result = request => result,
            };
            match result {
                Ok(Some(reply)) => send(&writer, &reply).await,
                Ok(None) => {}
                Err(e) => warn_collab(op, &e),
            }
        });
    }

    async fn dispatch(&mut self, msg: ParsedMessage) -> Flow {
        let tag = msg.tag();
        trace!(%tag, "Dispatching message from UI");

        match msg.into_value() {
            Message::Ping => send(&self.writer, &Message::Pong).await,
            Message::Pong => trace!("UI answered ping"),
            Message::PowerOff => {
                info!("UI requested power-off");
                return Flow::PowerOff;
            }
            Message::Standby => {
                debug!("UI entered standby");
                self.poll_state.set_standby(true);
            }
            Message::Wakeup => {
                debug!("UI woke up");
                self.poll_state.set_standby(false);
            }
            Message::GetNetworkReport(req) => {
                let wifi = Arc::clone(&self.collab.wifi);
                self.spawn_request("get_network_report", async move {
                    let report = wifi.network_report(req.scan).await?;
                    Ok(Some(Message::NetworkReport(report)))
                });
            }
            Message::WifiConnect(req) => {
                let wifi = Arc::clone(&self.collab.wifi);
                info!(ssid = %req.ssid, "Joining wifi network");
                self.spawn_request("wifi_connect", async move {
                    wifi.connect(&req.ssid, &req.password).await?;
                    let report = wifi.network_report(false).await?;
                    Ok(Some(Message::NetworkReport(report)))
                });
            }
            Message::LightningGetCtrlConn => {
                let lightning = Arc::clone(&self.collab.lightning);
                self.spawn_request("lightning_get_ctrlconn", async move {
                    Ok(match lightning.ctrlconn().await {
                        Ok(conns) => Some(Message::LightningCtrlConn(conns)),
                        Err(e) => lightning_error("lightning_get_ctrlconn", &e),
                    })
                });
            }
            Message::LightningInitWallet(seed) => {
                let lightning = Arc::clone(&self.collab.lightning);
                let poll_state = Arc::clone(&self.poll_state);
                info!("Initializing lightning wallet");
                self.spawn_request("lightning_init_wallet", async move {
                    Ok(match lightning.init_wallet(&seed).await {
                        Ok(()) => {
                            poll_state.poll_now();
                            None
                        }
                        Err(e) => lightning_error("lightning_init_wallet", &e),
                    })
                });
            }
            Message::LightningReset => {
                let lightning = Arc::clone(&self.collab.lightning);
                let poll_state = Arc::clone(&self.poll_state);
                warn!("Resetting lightning wallet");
                self.spawn_request("lightning_reset", async move {
                    Ok(match lightning.reset().await {
                        Ok(()) => {
                            poll_state.rearm_genseed();
                            poll_state.poll_now();
                            None
                        }
                        Err(e) => lightning_error("lightning_reset", &e),
                    })
                });
            }
            Message::GetSettings => {
                let settings = Arc::clone(&self.collab.settings);
                self.spawn_request("get_settings", async move {
                    Ok(Some(Message::Settings(settings.settings().await?)))
                });
            }
            Message::SwitchSysupdates(req) => {
                let settings = Arc::clone(&self.collab.settings);
                info!(channel = %req.channel, "Switching sysupdates channel");
                self.spawn_request("switch_sysupdates", async move {
                    settings.switch_sysupdates(req.channel).await?;
                    Ok(Some(Message::Settings(settings.settings().await?)))
                });
            }
            Message::SetNodename(req) => {
                let settings = Arc::clone(&self.collab.settings);
                let system = Arc::clone(&self.collab.system);
                info!(name = %req.name, "Renaming node");
                self.spawn_request("set_nodename", async move {
                    system.set_hostname(&req.name).await?;
                    settings.set_nodename(&req.name).await?;
                    Ok(Some(Message::Settings(settings.settings().await?)))
                });
            }
            Message::UnlockScreen(req) => {
                let settings = Arc::clone(&self.collab.settings);
                self.spawn_request("unlock_screen", async move {
                    let result = match settings.unlock(&req.pincode).await {
                        Ok(()) => ScreenUnlockResult { ok: true, err: None },
                        Err(e) => ScreenUnlockResult {
                            ok: false,
                            err: Some(e.to_string()),
                        },
                    };
                    Ok(Some(Message::ScreenUnlockResult(result)))
                });
            }
            Message::SlockSetPincode(req) => {
                let settings = Arc::clone(&self.collab.settings);
                self.spawn_request("slock_set_pincode", async move {
                    settings.set_pincode(req.pincode.as_deref()).await?;
                    Ok(Some(Message::Settings(settings.settings().await?)))
                });
            }
            Message::NetworkReport(_)
            | Message::PowerOffProgress(_)
            | Message::OnchainReport(_)
            | Message::LightningReport(_)
            | Message::LightningError(_)
            | Message::LightningGenseedResult(_)
            | Message::LightningCtrlConn(_)
            | Message::Settings(_)
            | Message::LockScreen
            | Message::ScreenUnlockResult(_) => {
                debug!(%tag, "Ignoring UI-bound message from UI");
            }
        }
        Flow::Continue
    }
}
