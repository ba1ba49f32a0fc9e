//! The display toolkit seam and the actions it raises.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::comm::Message;
use crate::comm::payload::{
    GetNetworkReport, LightningCtrlConn, LightningError, LightningReport, Mnemonic,
    NetworkReport, OnchainReport, PowerOffProgress, ScreenUnlockResult, SetNodename, Settings,
    SlockSetPincode, SwitchSysupdates, SysupdatesChannel, UnlockScreen, WifiConnect,
};

/// Queue depth between the screen and the communication worker.
pub const COMMAND_QUEUE: usize = 32;

/// A display the UI runtime drives.
///
/// Every method is called with the UI state lock held, so implementations
/// never see concurrent calls. Methods must not block: input is gathered in
/// [`tick`](Self::tick) and actions are queued as [`UiCommand`]s.
pub trait Screen: Send {
    /// Process input and redraw. Returns how long the screen can wait
    /// before the next tick.
    fn tick(&mut self) -> Duration;

    /// Time since the last user input.
    fn idle_time(&self) -> Duration;

    /// While asleep: whether input arrived that should wake the screen.
    fn poll_wake_input(&mut self) -> bool;

    /// Turn the backlight off (`true`) or on.
    fn set_asleep(&mut self, asleep: bool);

    fn show_network_report(&mut self, report: &NetworkReport);
    fn show_onchain_report(&mut self, report: &OnchainReport);
    fn show_lightning_report(&mut self, report: &LightningReport);
    fn show_lightning_error(&mut self, err: &LightningError);
    fn show_poweroff_progress(&mut self, progress: &PowerOffProgress);
    fn show_settings(&mut self, settings: &Settings);
    fn show_genseed(&mut self, seed: &Mnemonic);
    fn show_ctrlconn(&mut self, conns: &LightningCtrlConn);
    fn show_unlock_result(&mut self, result: &ScreenUnlockResult);
    fn show_lock_screen(&mut self);
}

/// Hand a daemon message to the matching `show_*` method.
///
/// Returns `false` for messages that have nothing to show.
pub fn show_message<S: Screen + ?Sized>(screen: &mut S, msg: &Message) -> bool {
    match msg {
        Message::NetworkReport(r) => screen.show_network_report(r),
        Message::OnchainReport(r) => screen.show_onchain_report(r),
        Message::LightningReport(r) => screen.show_lightning_report(r),
        Message::LightningError(e) => screen.show_lightning_error(e),
        Message::PowerOffProgress(p) => screen.show_poweroff_progress(p),
        Message::Settings(s) => screen.show_settings(s),
        Message::LightningGenseedResult(seed) => screen.show_genseed(seed),
        Message::LightningCtrlConn(c) => screen.show_ctrlconn(c),
        Message::ScreenUnlockResult(r) => screen.show_unlock_result(r),
        Message::LockScreen => screen.show_lock_screen(),
        _ => return false,
    }
    true
}

/// An action raised by the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    WifiConnect(WifiConnect),
    RefreshNetwork { scan: bool },
    /// Show the power-off confirmation; enters alert.
    RequestPowerOff,
    /// The user confirmed power-off; the daemon takes over.
    ConfirmPowerOff,
    /// Leave alert, e.g. the confirmation was cancelled.
    DismissAlert,
    SetNodename(String),
    SwitchSysupdates(SysupdatesChannel),
    UnlockScreen(UnlockScreen),
    SetPincode(SlockSetPincode),
    InitWallet(Mnemonic),
    GetCtrlConn,
    ResetLightning,
    GetSettings,
    /// Stop the UI process.
    Quit,
}

impl UiCommand {
    /// The message to send to the daemon, if this command has one.
    pub fn into_message(self) -> Option<Message> {
        let msg = match self {
            UiCommand::WifiConnect(req) => Message::WifiConnect(req),
            UiCommand::RefreshNetwork { scan } => {
                Message::GetNetworkReport(GetNetworkReport { scan })
            }
            UiCommand::ConfirmPowerOff => Message::PowerOff,
            UiCommand::SetNodename(name) => Message::SetNodename(SetNodename { name }),
            UiCommand::SwitchSysupdates(channel) => {
                Message::SwitchSysupdates(SwitchSysupdates { channel })
            }
            UiCommand::UnlockScreen(req) => Message::UnlockScreen(req),
            UiCommand::SetPincode(req) => Message::SlockSetPincode(req),
            UiCommand::InitWallet(seed) => Message::LightningInitWallet(seed),
            UiCommand::GetCtrlConn => Message::LightningGetCtrlConn,
            UiCommand::ResetLightning => Message::LightningReset,
            UiCommand::GetSettings => Message::GetSettings,
            UiCommand::RequestPowerOff | UiCommand::DismissAlert | UiCommand::Quit => {
                return None;
            }
        };
        Some(msg)
    }
}

/// The channel a screen uses to raise [`UiCommand`]s.
pub fn command_channel() -> (mpsc::Sender<UiCommand>, mpsc::Receiver<UiCommand>) {
    mpsc::channel(COMMAND_QUEUE)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::comm::MessageTag;

    #[test]
    fn test_command_messages() {
        let cases = [
            (
                UiCommand::RefreshNetwork { scan: true },
                Some(MessageTag::GetNetworkReport),
            ),
            (UiCommand::ConfirmPowerOff, Some(MessageTag::PowerOff)),
            (
                UiCommand::SetNodename("satoshi".into()),
                Some(MessageTag::SetNodename),
            ),
            (UiCommand::GetCtrlConn, Some(MessageTag::LightningGetCtrlConn)),
            (UiCommand::RequestPowerOff, None),
            (UiCommand::DismissAlert, None),
            (UiCommand::Quit, None),
        ];
        for (cmd, tag) in cases {
            assert_eq!(cmd.into_message().map(|m| m.tag()), tag);
        }
    }

    #[test]
    fn test_wifi_connect_command_keeps_credentials() {
        let msg = UiCommand::WifiConnect(WifiConnect::new("home", "x"))
            .into_message()
            .unwrap();
        assert_eq!(msg, Message::WifiConnect(WifiConnect::new("home", "x")));
    }
}
