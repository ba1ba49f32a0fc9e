//! A screen that records what it was asked to show.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ndg_core::comm::Message;
use ndg_core::comm::payload::*;
use ndg_core::ui::Screen;

/// What a [`FakeScreen`] has seen, shared with the test.
#[derive(Debug, Default)]
pub struct ScreenRecord {
    /// Every `show_*` call, as the message it displayed.
    pub shown: Vec<Message>,
    pub asleep: bool,
    /// Reported by `idle_time`.
    pub idle: Duration,
    /// Consumed by the next `poll_wake_input`.
    pub wake_input: bool,
    pub ticks: usize,
}

/// A [`Screen`] whose state is visible through a [`FakeScreenHandle`].
#[derive(Debug, Clone, Default)]
pub struct FakeScreen {
    record: Arc<Mutex<ScreenRecord>>,
}

/// The test's view of a [`FakeScreen`] owned by a runtime.
#[derive(Debug, Clone)]
pub struct FakeScreenHandle {
    record: Arc<Mutex<ScreenRecord>>,
}

impl FakeScreen {
    pub fn new() -> (Self, FakeScreenHandle) {
        let screen = Self::default();
        let handle = FakeScreenHandle {
            record: Arc::clone(&screen.record),
        };
        (screen, handle)
    }

    fn record(&self) -> MutexGuard<'_, ScreenRecord> {
        self.record.lock().expect("screen record poisoned")
    }

    fn push(&self, msg: Message) {
        self.record().shown.push(msg);
    }
}

impl FakeScreenHandle {
    pub fn record(&self) -> MutexGuard<'_, ScreenRecord> {
        self.record.lock().expect("screen record poisoned")
    }

    /// Pretend the user has been idle for `idle`.
    pub fn set_idle(&self, idle: Duration) {
        self.record().idle = idle;
    }

    /// Pretend the user touched the asleep screen.
    pub fn touch(&self) {
        let mut record = self.record();
        record.wake_input = true;
        record.idle = Duration::ZERO;
    }

    pub fn shown(&self) -> Vec<Message> {
        self.record().shown.clone()
    }

    pub fn is_asleep(&self) -> bool {
        self.record().asleep
    }
}

impl Screen for FakeScreen {
    fn tick(&mut self) -> Duration {
        self.record().ticks += 1;
        Duration::from_millis(5)
    }

    fn idle_time(&self) -> Duration {
        self.record().idle
    }

    fn poll_wake_input(&mut self) -> bool {
        std::mem::take(&mut self.record().wake_input)
    }

    fn set_asleep(&mut self, asleep: bool) {
        self.record().asleep = asleep;
    }

    fn show_network_report(&mut self, report: &NetworkReport) {
        self.push(Message::NetworkReport(report.clone()));
    }

    fn show_onchain_report(&mut self, report: &OnchainReport) {
        self.push(Message::OnchainReport(report.clone()));
    }

    fn show_lightning_report(&mut self, report: &LightningReport) {
        self.push(Message::LightningReport(report.clone()));
    }

    fn show_lightning_error(&mut self, err: &LightningError) {
        self.push(Message::LightningError(err.clone()));
    }

    fn show_poweroff_progress(&mut self, progress: &PowerOffProgress) {
        self.push(Message::PowerOffProgress(progress.clone()));
    }

    fn show_settings(&mut self, settings: &Settings) {
        self.push(Message::Settings(settings.clone()));
    }

    fn show_genseed(&mut self, seed: &Mnemonic) {
        self.push(Message::LightningGenseedResult(seed.clone()));
    }

    fn show_ctrlconn(&mut self, conns: &LightningCtrlConn) {
        self.push(Message::LightningCtrlConn(conns.clone()));
    }

    fn show_unlock_result(&mut self, result: &ScreenUnlockResult) {
        self.push(Message::ScreenUnlockResult(result.clone()));
    }

    fn show_lock_screen(&mut self) {
        self.push(Message::LockScreen);
    }
}
