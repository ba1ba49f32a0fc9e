//! [`Screen`] for a device without a display: updates go to the log.

use std::time::Duration;

use ndg_core::comm::payload::{
    LightningCtrlConn, LightningError, LightningReport, Mnemonic, NetworkReport, OnchainReport,
    PowerOffProgress, ScreenUnlockResult, Settings,
};
use ndg_core::ui::Screen;
use tracing::{info, warn};

/// Nothing to draw and no input, so the screen never idles into standby.
#[derive(Debug, Default)]
pub struct HeadlessScreen {
    updates: usize,
}

impl HeadlessScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many updates were logged.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl Screen for HeadlessScreen {
    fn tick(&mut self) -> Duration {
        Duration::from_secs(1)
    }

    fn idle_time(&self) -> Duration {
        Duration::ZERO
    }

    fn poll_wake_input(&mut self) -> bool {
        false
    }

    fn set_asleep(&mut self, _asleep: bool) {}

    fn show_network_report(&mut self, report: &NetworkReport) {
        self.updates += 1;
        info!(
            ssid = report.wifi_ssid.as_deref().unwrap_or("-"),
            addrs = %report.ipaddrs.join(","),
            "Network"
        );
    }

    fn show_onchain_report(&mut self, report: &OnchainReport) {
        self.updates += 1;
        info!(
            height = report.height,
            progress = report.sync.progress,
            mempool_tx = report.mempool.txcount,
            "Chain"
        );
    }

    fn show_lightning_report(&mut self, report: &LightningReport) {
        self.updates += 1;
        info!(
            alias = %report.alias,
            peers = report.npeers,
            channels = report.channels.len(),
            "Lightning"
        );
    }

    fn show_lightning_error(&mut self, err: &LightningError) {
        self.updates += 1;
        info!(code = ?err.code, "Lightning unavailable");
    }

    fn show_poweroff_progress(&mut self, progress: &PowerOffProgress) {
        self.updates += 1;
        for svc in &progress.services {
            info!(
                service = %svc.name,
                stopped = svc.stopped,
                err = svc.err.as_deref().unwrap_or(""),
                "Power-off progress"
            );
        }
    }

    fn show_settings(&mut self, settings: &Settings) {
        self.updates += 1;
        info!(
            hostname = %settings.hostname,
            sysupdates = %settings.sysupdates.channel,
            "Settings"
        );
    }

    fn show_genseed(&mut self, seed: &Mnemonic) {
        self.updates += 1;
        // The words are never logged; without a display nobody can confirm them.
        warn!(words = seed.mnemonic.len(), "Wallet seed offered but no display to show it");
    }

    fn show_ctrlconn(&mut self, conns: &LightningCtrlConn) {
        self.updates += 1;
        info!(count = conns.conns.len(), "Lightning control connections");
    }

    fn show_unlock_result(&mut self, result: &ScreenUnlockResult) {
        self.updates += 1;
        info!(ok = result.ok, "Screen unlock");
    }

    fn show_lock_screen(&mut self) {
        self.updates += 1;
        info!("Screen locked");
    }
}

#[cfg(test)]
mod tests {
    use ndg_core::Message;
    use ndg_core::ui::show_message;

    use super::*;

    #[test]
    fn test_headless_never_sleeps() {
        let mut screen = HeadlessScreen::new();
        assert_eq!(screen.idle_time(), Duration::ZERO);
        assert!(!screen.poll_wake_input());
    }

    #[test]
    fn test_headless_logs_every_update() {
        let mut screen = HeadlessScreen::new();
        assert!(show_message(
            &mut screen,
            &Message::NetworkReport(NetworkReport::default())
        ));
        assert!(show_message(&mut screen, &Message::LockScreen));
        assert!(!show_message(&mut screen, &Message::Ping));
        assert_eq!(screen.updates(), 2);
    }
}
