//! [`Screen`] on the controlling terminal.
//!
//! stdin and stdout are the daemon pipe, so the screen opens `/dev/tty`
//! directly for drawing. crossterm reads key events from the tty as well
//! when stdin is not one.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ndg_core::LogReader;
use ndg_core::comm::payload::{
    LightningCtrlConn, LightningError, LightningReport, Mnemonic, NetworkReport, OnchainReport,
    PowerOffProgress, ScreenUnlockResult, Settings,
};
use ndg_core::ui::{Screen, UiCommand};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::App;
use crate::ui;

/// Redraw interval while the user is active.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

pub struct TerminalScreen {
    terminal: Terminal<CrosstermBackend<File>>,
    app: App,
    commands: mpsc::Sender<UiCommand>,
}

impl TerminalScreen {
    /// Take over the terminal at `tty`.
    pub fn open(
        tty: &Path,
        log_reader: LogReader,
        commands: mpsc::Sender<UiCommand>,
    ) -> io::Result<Self> {
        let mut out = OpenOptions::new().read(true).write(true).open(tty)?;
        enable_raw_mode()?;
        if let Err(e) = out.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            app: App::new(log_reader),
            commands,
        })
    }

    fn raise(&self, cmd: UiCommand) {
        if let Err(e) = self.commands.try_send(cmd) {
            warn!(error = %e, "Dropping screen command");
        }
    }

    fn draw(&mut self) {
        let app = &self.app;
        if let Err(e) = self.terminal.draw(|frame| ui::draw(frame, app)) {
            warn!(error = %e, "Failed to draw screen");
        }
    }

    /// Pending key presses, without blocking.
    fn read_keys(&mut self) -> Vec<crossterm::event::KeyCode> {
        let mut keys = Vec::new();
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    debug!(error = %e, "Terminal poll failed");
                    break;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => keys.push(key.code),
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "Terminal read failed");
                    break;
                }
            }
        }
        keys
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

impl Screen for TerminalScreen {
    fn tick(&mut self) -> Duration {
        for key in self.read_keys() {
            if let Some(cmd) = self.app.handle_key(key) {
                self.raise(cmd);
            }
        }
        self.app.tick();
        self.draw();
        FRAME_INTERVAL
    }

    fn idle_time(&self) -> Duration {
        self.app.last_input.elapsed()
    }

    fn poll_wake_input(&mut self) -> bool {
        // The waking key press is swallowed, not acted on.
        if self.read_keys().is_empty() {
            return false;
        }
        self.app.last_input = std::time::Instant::now();
        true
    }

    fn set_asleep(&mut self, asleep: bool) {
        if let Err(e) = self.terminal.clear() {
            warn!(error = %e, asleep, "Failed to clear screen");
        }
        if !asleep {
            self.draw();
        }
    }

    fn show_network_report(&mut self, report: &NetworkReport) {
        self.app.set_network(report);
    }

    fn show_onchain_report(&mut self, report: &OnchainReport) {
        self.app.set_onchain(report);
    }

    fn show_lightning_report(&mut self, report: &LightningReport) {
        self.app.set_lightning(report);
    }

    fn show_lightning_error(&mut self, err: &LightningError) {
        self.app.set_lightning_error(err.code);
    }

    fn show_poweroff_progress(&mut self, progress: &PowerOffProgress) {
        self.app.set_poweroff(progress);
        self.draw();
    }

    fn show_settings(&mut self, settings: &Settings) {
        self.app.set_settings(settings);
    }

    fn show_genseed(&mut self, seed: &Mnemonic) {
        self.app.set_seed(seed);
    }

    fn show_ctrlconn(&mut self, conns: &LightningCtrlConn) {
        self.app.set_ctrlconn(conns);
    }

    fn show_unlock_result(&mut self, result: &ScreenUnlockResult) {
        self.app.unlock_result(result);
    }

    fn show_lock_screen(&mut self) {
        self.app.lock();
    }
}
