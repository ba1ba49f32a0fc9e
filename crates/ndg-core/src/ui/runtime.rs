//! The UI's two workers over the shared display state.
//!
//! The render worker ticks the screen and runs the idle/standby cycle. The
//! communication worker reads daemon messages and screen commands. Both
//! touch the mode, the report cache and the screen only while holding the
//! state lock.

use std::sync::Arc;
use std::time::Duration;

use ndg_config::UiConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Notify, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::cache::LastReportCache;
use super::mode::Mode;
use super::screen::{Screen, UiCommand, show_message};
use crate::comm::{Message, MessageTag, ParsedMessage};
use crate::signal::ShutdownSignal;
use crate::transport::{FrameReader, FrameWriter, Transport};

const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything guarded by the UI state lock.
#[derive(Debug)]
pub struct UiState<S> {
    pub mode: Mode,
    pub cache: LastReportCache,
    pub screen: S,
}

impl<S: Screen> UiState<S> {
    pub fn new(screen: S) -> Self {
        Self {
            mode: Mode::Active,
            cache: LastReportCache::new(),
            screen,
        }
    }

    /// Leave standby: light the screen and replay every cached report once.
    fn wake(&mut self) {
        self.mode = self.mode.woken();
        self.screen.set_asleep(false);
        let UiState { cache, screen, .. } = self;
        for msg in cache.iter() {
            show_message(screen, msg.value());
        }
    }
}

/// The runtime timing knobs, taken from `[ui]`.
#[derive(Debug, Clone, Copy)]
struct Timing {
    standby_idle: Duration,
    standby_poll: Duration,
    max_tick: Duration,
}

/// The UI process runtime.
pub struct UiRuntime<S, R, W> {
    state: Arc<Mutex<UiState<S>>>,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    commands: mpsc::Receiver<UiCommand>,
    wake: Arc<Notify>,
    timing: Timing,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    shutdown_rx: broadcast::Receiver<ShutdownSignal>,
}

impl<S, R, W> UiRuntime<S, R, W>
where
    S: Screen + 'static,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        config: &UiConfig,
        screen: S,
        transport: Transport<R, W>,
        commands: mpsc::Receiver<UiCommand>,
    ) -> Self {
        let (reader, writer) = transport.split();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        Self {
            state: Arc::new(Mutex::new(UiState::new(screen))),
            reader,
            writer,
            commands,
            wake: Arc::new(Notify::new()),
            timing: Timing {
                standby_idle: config.standby_idle(),
                standby_poll: config.standby_poll(),
                max_tick: config.max_tick(),
            },
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// The shared state, for inspection.
    pub fn state(&self) -> Arc<Mutex<UiState<S>>> {
        Arc::clone(&self.state)
    }

    /// Sending on this stops the runtime.
    pub fn shutdown_handle(&self) -> broadcast::Sender<ShutdownSignal> {
        self.shutdown_tx.clone()
    }

    /// Run both workers until shutdown: a signal, end-of-stream from the
    /// daemon, or [`UiCommand::Quit`]. Cached reports are released on exit.
    pub async fn run(mut self) {
        let render = tokio::spawn(
            RenderWorker {
                state: Arc::clone(&self.state),
                writer: self.writer.clone(),
                wake: Arc::clone(&self.wake),
                timing: self.timing,
            }
            .run(self.shutdown_tx.subscribe()),
        );
        let comm = tokio::spawn(
            CommWorker {
                state: Arc::clone(&self.state),
                writer: self.writer.clone(),
                wake: Arc::clone(&self.wake),
                shutdown_tx: self.shutdown_tx.clone(),
            }
            .run(self.reader, self.commands, self.shutdown_tx.subscribe()),
        );

        let _ = self.shutdown_rx.recv().await;
        info!("UI shutting down");

        join_worker("render", render).await;
        join_worker("comm", comm).await;
        self.state.lock().await.cache.clear();
    }
}

async fn join_worker(name: &str, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(WORKER_JOIN_TIMEOUT, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(worker = name, error = %e, "UI worker failed"),
        Err(_) => {
            debug!(worker = name, "UI worker still busy, aborting");
            handle.abort();
        }
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &FrameWriter<W>, msg: &Message) {
    if let Err(e) = writer.write(msg).await {
        warn!(tag = %msg.tag(), error = %e, "Failed to send message to daemon");
    }
}

struct RenderWorker<S, W> {
    state: Arc<Mutex<UiState<S>>>,
    writer: FrameWriter<W>,
    wake: Arc<Notify>,
    timing: Timing,
}

impl<S: Screen, W: AsyncWrite + Unpin> RenderWorker<S, W> {
    async fn run(self, mut shutdown: broadcast::Receiver<ShutdownSignal>) {
        loop {
            let (delay, sleeping) = {
                let mut state = self.state.lock().await;
                let delay = state.screen.tick();
                let sleeping = state.mode.can_sleep()
                    && state.screen.idle_time() >= self.timing.standby_idle;
                if sleeping {
                    state.mode = Mode::Standby;
                    state.screen.set_asleep(true);
                }
                (delay.min(self.timing.max_tick), sleeping)
            };

            if sleeping {
                info!("Entering standby");
                send(&self.writer, &Message::Standby).await;
                if !self.park(&mut shutdown).await {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        debug!("Render worker stopped");
    }

    /// Wait in standby for input or the wake signal, then wake up. Returns
    /// `false` if shutdown arrived instead.
    ///
    /// The signal only counts while the mode has left standby. A permit left
    /// over from a signal that raced an input wake must not end a later
    /// standby.
    async fn park(&self, shutdown: &mut broadcast::Receiver<ShutdownSignal>) -> bool {
        let mut poll = tokio::time::interval(self.timing.standby_poll);
        loop {
            tokio::select! {
                _ = shutdown.recv() => return false,
                _ = self.wake.notified() => {
                    if self.state.lock().await.mode != Mode::Standby {
                        debug!("Woken by signal");
                        break;
                    }
                    trace!("Ignoring stale wake signal");
                }
                _ = poll.tick() => {
                    if self.state.lock().await.screen.poll_wake_input() {
                        debug!("Woken by input");
                        break;
                    }
                }
            }
        }

        let mode = {
            let mut state = self.state.lock().await;
            state.wake();
            state.mode
        };
        info!(%mode, "Leaving standby");
        send(&self.writer, &Message::Wakeup).await;
        true
    }
}

struct CommWorker<S, W> {
    state: Arc<Mutex<UiState<S>>>,
    writer: FrameWriter<W>,
    wake: Arc<Notify>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl<S: Screen, W: AsyncWrite + Unpin> CommWorker<S, W> {
    async fn run<R: AsyncRead + Unpin>(
        self,
        mut reader: FrameReader<R>,
        mut commands: mpsc::Receiver<UiCommand>,
        mut shutdown: broadcast::Receiver<ShutdownSignal>,
    ) {
        let mut commands_open = true;
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        debug!("Screen command channel closed");
                        commands_open = false;
                    }
                },
                read = reader.read() => match read {
                    Ok(msg) => self.handle_message(msg).await,
                    Err(e) if e.is_end_of_stream() => {
                        info!("Daemon closed the pipe");
                        let _ = self.shutdown_tx.send(ShutdownSignal);
                        break;
                    }
                    Err(e) => warn!(error = %e, "Failed to read message from daemon"),
                },
            }
        }
        debug!("Comm worker stopped");
    }

    async fn handle_message(&self, msg: ParsedMessage) {
        let tag = msg.tag();
        trace!(%tag, "Message from daemon");

        match tag {
            MessageTag::Ping => {
                send(&self.writer, &Message::Pong).await;
                msg.release();
            }
            MessageTag::NetworkReport
            | MessageTag::OnchainReport
            | MessageTag::LightningReport
            | MessageTag::LightningError => {
                let mut state = self.state.lock().await;
                if state.mode != Mode::Standby {
                    show_message(&mut state.screen, msg.value());
                }
                if let Err(msg) = state.cache.store(msg) {
                    msg.release();
                }
            }
            MessageTag::PowerOffProgress => {
                show_message(&mut self.state.lock().await.screen, msg.value());
                self.enter_alert().await;
                msg.release();
            }
            MessageTag::Settings
            | MessageTag::LightningGenseedResult
            | MessageTag::LightningCtrlConn
            | MessageTag::ScreenUnlockResult
            | MessageTag::LockScreen => {
                show_message(&mut self.state.lock().await.screen, msg.value());
                msg.release();
            }
            MessageTag::Pong => {
                trace!("Daemon answered ping");
                msg.release();
            }
            _ => {
                debug!(%tag, "Ignoring message not meant for the UI");
                msg.release();
            }
        }
    }

    /// Switch to alert, raising the wake signal if the screen is asleep.
    async fn enter_alert(&self) {
        let was_asleep = {
            let mut state = self.state.lock().await;
            let was_asleep = state.mode == Mode::Standby;
            state.mode = Mode::Alert;
            was_asleep
        };
        if was_asleep {
            self.wake.notify_one();
        }
    }

    async fn handle_command(&self, cmd: UiCommand) {
        match cmd {
            UiCommand::RequestPowerOff => {
                self.enter_alert().await;
                debug!("Power-off confirmation shown");
            }
            UiCommand::DismissAlert => {
                let mut state = self.state.lock().await;
                if state.mode == Mode::Alert {
                    state.mode = Mode::Active;
                }
            }
            UiCommand::ConfirmPowerOff => {
                self.enter_alert().await;
                info!("Power-off confirmed");
                send(&self.writer, &Message::PowerOff).await;
            }
            UiCommand::Quit => {
                info!("Quit requested");
                let _ = self.shutdown_tx.send(ShutdownSignal);
            }
            other => {
                if let Some(msg) = other.into_message() {
                    send(&self.writer, &msg).await;
                }
            }
        }
    }
}
