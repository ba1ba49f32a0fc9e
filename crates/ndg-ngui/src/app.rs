//! Terminal screen state: what the daemon last told us and what the user
//! is doing with it.

use std::time::Instant;

use crossterm::event::KeyCode;
use ndg_core::LogReader;
use ndg_core::comm::payload::{
    LightningCtrlConn, LightningErrorCode, LightningReport, Mnemonic, NetworkReport,
    OnchainReport, PowerOffProgress, ScreenUnlockResult, Settings, SlockSetPincode,
    SysupdatesChannel, UnlockScreen, WifiConnect,
};
use ndg_core::ui::UiCommand;
use zeroize::Zeroize;

use crate::keymap::{Action, Keymap};
use crate::panels::{LightningPanel, LogsPanel, PanelState};

/// The panels available on the terminal screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Bitcoin,
    Lightning,
    Settings,
    Logs,
}

impl Panel {
    pub fn title(self) -> &'static str {
        match self {
            Panel::Bitcoin => "Bitcoin",
            Panel::Lightning => "Lightning",
            Panel::Settings => "Settings",
            Panel::Logs => "Logs",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Panel::Bitcoin => 0,
            Panel::Lightning => 1,
            Panel::Settings => 2,
            Panel::Logs => 3,
        }
    }

    pub fn next(self) -> Self {
        ALL_PANELS[(self.index() + 1) % ALL_PANELS.len()]
    }

    pub fn prev(self) -> Self {
        ALL_PANELS[(self.index() + ALL_PANELS.len() - 1) % ALL_PANELS.len()]
    }
}

pub const ALL_PANELS: [Panel; 4] = [Panel::Bitcoin, Panel::Lightning, Panel::Settings, Panel::Logs];

/// A yes/no question on top of the panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    PowerOff,
    ResetWallet,
}

impl Dialog {
    pub fn question(self) -> &'static str {
        match self {
            Dialog::PowerOff => "Power off the node?",
            Dialog::ResetWallet => "Delete the lightning wallet?",
        }
    }
}

/// What a text prompt is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The screen is locked; only the pincode gets through.
    Unlock,
    WifiSsid,
    WifiPassword { ssid: String },
    Nodename,
    /// New screen-lock pincode; empty disables the lock.
    Pincode,
}

impl PromptKind {
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::Unlock => "Pincode",
            PromptKind::WifiSsid => "Wifi network",
            PromptKind::WifiPassword { .. } => "Wifi password",
            PromptKind::Nodename => "Node name",
            PromptKind::Pincode => "New pincode (empty disables)",
        }
    }

    /// Whether the typed text is shown masked.
    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            PromptKind::Unlock | PromptKind::WifiPassword { .. } | PromptKind::Pincode
        )
    }
}

/// A single-line text prompt.
#[derive(Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: String::new(),
        }
    }

    pub fn display_input(&self) -> String {
        if self.kind.is_secret() {
            "*".repeat(self.input.chars().count())
        } else {
            self.input.clone()
        }
    }
}

impl Drop for Prompt {
    fn drop(&mut self) {
        self.input.zeroize();
    }
}

/// Terminal screen state.
pub struct App {
    pub active_panel: Panel,
    pub keymap: Keymap,
    pub last_input: Instant,

    pub network: Option<NetworkReport>,
    pub onchain: Option<OnchainReport>,
    pub settings: Option<Settings>,
    pub poweroff: Option<PowerOffProgress>,

    pub lightning: LightningPanel,
    pub logs: LogsPanel,

    pub dialog: Option<Dialog>,
    pub prompt: Option<Prompt>,
    /// Shown in the status bar until the next key press.
    pub notice: Option<String>,
}

impl App {
    pub fn new(log_reader: LogReader) -> Self {
        Self {
            active_panel: Panel::Bitcoin,
            keymap: Keymap::new(),
            last_input: Instant::now(),
            network: None,
            onchain: None,
            settings: None,
            poweroff: None,
            lightning: LightningPanel::new(),
            logs: LogsPanel::new(log_reader),
            dialog: None,
            prompt: None,
            notice: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(&self.prompt, Some(p) if p.kind == PromptKind::Unlock)
    }

    /// Handle a key press, returning the command it raises, if any.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<UiCommand> {
        self.last_input = Instant::now();
        if self.poweroff.is_some() {
            return None;
        }
        if self.prompt.is_some() {
            return self.prompt_key(key);
        }
        self.notice = None;
        if let Some(dialog) = self.dialog {
            return self.dialog_key(dialog, key);
        }
        let action = self.keymap.map(key);
        self.handle_action(action)
    }

    fn dialog_key(&mut self, dialog: Dialog, key: KeyCode) -> Option<UiCommand> {
        match key {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.dialog = None;
                Some(match dialog {
                    Dialog::PowerOff => UiCommand::ConfirmPowerOff,
                    Dialog::ResetWallet => UiCommand::ResetLightning,
                })
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.dialog = None;
                match dialog {
                    Dialog::PowerOff => Some(UiCommand::DismissAlert),
                    Dialog::ResetWallet => None,
                }
            }
            _ => None,
        }
    }

    fn prompt_key(&mut self, key: KeyCode) -> Option<UiCommand> {
        let prompt = self.prompt.as_mut()?;
        match key {
            KeyCode::Char(c) => {
                prompt.input.push(c);
                None
            }
            KeyCode::Backspace => {
                prompt.input.pop();
                None
            }
            KeyCode::Esc if prompt.kind != PromptKind::Unlock => {
                self.prompt = None;
                None
            }
            KeyCode::Enter => self.submit_prompt(),
            _ => None,
        }
    }

    fn submit_prompt(&mut self) -> Option<UiCommand> {
        let prompt = self.prompt.take()?;
        let input = prompt.input.as_str();
        match &prompt.kind {
            PromptKind::Unlock => {
                let cmd = UiCommand::UnlockScreen(UnlockScreen {
                    pincode: input.to_string(),
                });
                // Stay locked until the daemon answers.
                self.prompt = Some(Prompt::new(PromptKind::Unlock));
                Some(cmd)
            }
            PromptKind::WifiSsid if input.is_empty() => None,
            PromptKind::WifiSsid => {
                self.prompt = Some(Prompt::new(PromptKind::WifiPassword {
                    ssid: input.to_string(),
                }));
                None
            }
            PromptKind::WifiPassword { ssid } => {
                self.notice = Some(format!("Joining {ssid}..."));
                Some(UiCommand::WifiConnect(WifiConnect::new(ssid, input)))
            }
            PromptKind::Nodename if input.is_empty() => None,
            PromptKind::Nodename => Some(UiCommand::SetNodename(input.to_string())),
            PromptKind::Pincode => Some(UiCommand::SetPincode(SlockSetPincode {
                pincode: (!input.is_empty()).then(|| input.to_string()),
            })),
        }
    }

    /// Show `panel`. Opening the settings panel asks for a fresh network
    /// report so the wifi details are current.
    fn switch_panel(&mut self, panel: Panel) -> Option<UiCommand> {
        let opened = self.active_panel != panel;
        self.active_panel = panel;
        (opened && panel == Panel::Settings).then_some(UiCommand::RefreshNetwork { scan: false })
    }

    /// Process a resolved action.
    pub fn handle_action(&mut self, action: Action) -> Option<UiCommand> {
        match action {
            Action::Quit => return Some(UiCommand::Quit),
            Action::NextPanel => return self.switch_panel(self.active_panel.next()),
            Action::PrevPanel => return self.switch_panel(self.active_panel.prev()),
            Action::GoToPanel(n) => return self.switch_panel(*ALL_PANELS.get(n)?),
            Action::ScrollDown => self.scrollable()?.scroll_down(1),
            Action::ScrollUp => self.scrollable()?.scroll_up(1),
            Action::ScrollToTop => self.scrollable()?.scroll_to_top(),
            Action::ScrollToBottom => self.scrollable()?.scroll_to_bottom(),
            Action::Refresh => return Some(UiCommand::RefreshNetwork { scan: false }),
            Action::Scan => {
                self.notice = Some("Scanning for wifi networks...".to_string());
                return Some(UiCommand::RefreshNetwork { scan: true });
            }
            Action::JoinWifi => self.prompt = Some(Prompt::new(PromptKind::WifiSsid)),
            Action::PowerOff => {
                self.dialog = Some(Dialog::PowerOff);
                return Some(UiCommand::RequestPowerOff);
            }
            Action::Rename => self.prompt = Some(Prompt::new(PromptKind::Nodename)),
            Action::ToggleSysupdates => {
                let current = self.settings.as_ref()?.sysupdates.channel;
                let next = match current {
                    SysupdatesChannel::Master => SysupdatesChannel::Dev,
                    SysupdatesChannel::Dev => SysupdatesChannel::Master,
                };
                return Some(UiCommand::SwitchSysupdates(next));
            }
            Action::SetPincode => self.prompt = Some(Prompt::new(PromptKind::Pincode)),
            Action::CtrlConn => return Some(UiCommand::GetCtrlConn),
            Action::InitWallet => {
                let seed = self.lightning.take_seed()?;
                self.notice = Some("Creating wallet...".to_string());
                return Some(UiCommand::InitWallet(seed));
            }
            Action::ResetWallet => self.dialog = Some(Dialog::ResetWallet),
            Action::None => {}
        }
        None
    }

    fn scrollable(&mut self) -> Option<&mut dyn PanelState> {
        match self.active_panel {
            Panel::Lightning => Some(&mut self.lightning),
            Panel::Logs => Some(&mut self.logs),
            Panel::Bitcoin | Panel::Settings => None,
        }
    }

    /// Refresh data from live sources.
    pub fn tick(&mut self) {
        self.logs.refresh();
    }

    pub fn set_network(&mut self, report: &NetworkReport) {
        self.network = Some(report.clone());
    }

    pub fn set_onchain(&mut self, report: &OnchainReport) {
        self.onchain = Some(report.clone());
    }

    pub fn set_lightning(&mut self, report: &LightningReport) {
        self.lightning.report = Some(report.clone());
        self.lightning.error = None;
    }

    pub fn set_lightning_error(&mut self, code: LightningErrorCode) {
        self.lightning.error = Some(code);
    }

    pub fn set_seed(&mut self, seed: &Mnemonic) {
        self.lightning.seed = Some(seed.clone());
    }

    pub fn set_ctrlconn(&mut self, conns: &LightningCtrlConn) {
        self.lightning.ctrlconn = Some(conns.clone());
    }

    pub fn set_settings(&mut self, settings: &Settings) {
        self.settings = Some(settings.clone());
    }

    pub fn set_poweroff(&mut self, progress: &PowerOffProgress) {
        self.dialog = None;
        self.prompt = None;
        self.poweroff = Some(progress.clone());
    }

    pub fn lock(&mut self) {
        self.dialog = None;
        self.prompt = Some(Prompt::new(PromptKind::Unlock));
    }

    pub fn unlock_result(&mut self, result: &ScreenUnlockResult) {
        if result.ok {
            if self.is_locked() {
                self.prompt = None;
            }
            self.notice = None;
        } else {
            let reason = result.err.as_deref().unwrap_or("unlock failed");
            self.notice = Some(reason.to_string());
        }
    }

    /// Get the status line text.
    pub fn status_line(&self) -> String {
        if let Some(notice) = &self.notice {
            return format!(" {notice}");
        }
        if self.is_locked() {
            return " Enter pincode, then Enter".to_string();
        }
        format!(
            " q:quit  Tab:next  1-4:panels  r/s:refresh/scan  w:wifi  p:power off  [{panel}]",
            panel = self.active_panel.title()
        )
    }
}

#[cfg(test)]
mod tests {
    use ndg_core::comm::payload::SysupdatesSettings;
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_app() -> App {
        let collector = ndg_core::LogCollector::new(100);
        App::new(collector.reader())
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert_eq!(app.handle_key(KeyCode::Char(c)), None);
        }
    }

    #[test]
    fn test_panel_cycle_wraps() {
        assert_eq!(Panel::Bitcoin.next(), Panel::Lightning);
        assert_eq!(Panel::Logs.next(), Panel::Bitcoin);
        assert_eq!(Panel::Bitcoin.prev(), Panel::Logs);
        for panel in ALL_PANELS {
            assert_eq!(panel.next().prev(), panel);
        }
    }

    #[test]
    fn test_goto_panel_out_of_range_ignored() {
        let mut app = make_app();
        app.handle_action(Action::GoToPanel(2));
        assert_eq!(app.active_panel, Panel::Settings);
        app.handle_action(Action::GoToPanel(99));
        assert_eq!(app.active_panel, Panel::Settings);
    }

    #[test]
    fn test_opening_settings_refreshes_network() {
        let mut app = make_app();
        assert_eq!(
            app.handle_key(KeyCode::Char('3')),
            Some(UiCommand::RefreshNetwork { scan: false })
        );
        assert_eq!(app.active_panel, Panel::Settings);
        // Already open: nothing to refresh.
        assert_eq!(app.handle_key(KeyCode::Char('3')), None);
        assert_eq!(app.handle_key(KeyCode::Tab), None);
        assert_eq!(app.active_panel, Panel::Logs);
        assert_eq!(
            app.handle_key(KeyCode::BackTab),
            Some(UiCommand::RefreshNetwork { scan: false })
        );
        assert_eq!(app.handle_key(KeyCode::Char('1')), None);
    }

    #[test]
    fn test_quit_key_raises_quit() {
        let mut app = make_app();
        assert_eq!(app.handle_key(KeyCode::Char('q')), Some(UiCommand::Quit));
    }

    #[test]
    fn test_power_off_confirm_flow() {
        let mut app = make_app();
        assert_eq!(
            app.handle_key(KeyCode::Char('p')),
            Some(UiCommand::RequestPowerOff)
        );
        assert_eq!(app.dialog, Some(Dialog::PowerOff));
        // Other keys do nothing while the dialog is open.
        assert_eq!(app.handle_key(KeyCode::Char('q')), None);
        assert_eq!(
            app.handle_key(KeyCode::Char('y')),
            Some(UiCommand::ConfirmPowerOff)
        );
        assert_eq!(app.dialog, None);
    }

    #[test]
    fn test_power_off_cancel_dismisses_alert() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.handle_key(KeyCode::Esc), Some(UiCommand::DismissAlert));
        assert_eq!(app.dialog, None);
    }

    #[test]
    fn test_reset_wallet_needs_confirmation() {
        let mut app = make_app();
        assert_eq!(app.handle_key(KeyCode::Char('X')), None);
        assert_eq!(app.handle_key(KeyCode::Char('n')), None);
        app.handle_key(KeyCode::Char('X'));
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(UiCommand::ResetLightning)
        );
    }

    #[test]
    fn test_wifi_prompt_collects_ssid_then_password() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('w'));
        type_text(&mut app, "home");
        assert_eq!(app.handle_key(KeyCode::Enter), None);
        type_text(&mut app, "hunter22");
        assert_eq!(app.prompt.as_ref().unwrap().display_input(), "********");
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(UiCommand::WifiConnect(WifiConnect::new("home", "hunter22")))
        );
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_prompt_escape_cancels() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('N'));
        type_text(&mut app, "sat");
        assert_eq!(app.handle_key(KeyCode::Esc), None);
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_rename_prompt() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('N'));
        type_text(&mut app, "satoshi");
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(UiCommand::SetNodename("satoshi".into()))
        );
    }

    #[test]
    fn test_empty_pincode_disables_lock() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('P'));
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(UiCommand::SetPincode(SlockSetPincode { pincode: None }))
        );
    }

    #[test]
    fn test_locked_screen_only_takes_pincode() {
        let mut app = make_app();
        app.lock();
        assert!(app.is_locked());
        // Escape cannot leave the lock prompt, and q is just a character.
        app.handle_key(KeyCode::Esc);
        assert!(app.is_locked());
        type_text(&mut app, "12");
        app.handle_key(KeyCode::Backspace);
        type_text(&mut app, "34");
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(UiCommand::UnlockScreen(UnlockScreen {
                pincode: "134".into()
            }))
        );
        assert!(app.is_locked());

        app.unlock_result(&ScreenUnlockResult {
            ok: false,
            err: Some("incorrect pincode".into()),
        });
        assert!(app.is_locked());
        assert!(app.status_line().contains("incorrect pincode"));

        app.unlock_result(&ScreenUnlockResult { ok: true, err: None });
        assert!(!app.is_locked());
    }

    #[test]
    fn test_toggle_sysupdates_needs_settings() {
        let mut app = make_app();
        assert_eq!(app.handle_action(Action::ToggleSysupdates), None);
        app.set_settings(&Settings {
            hostname: "nakamochi".into(),
            sysupdates: SysupdatesSettings {
                channel: SysupdatesChannel::Master,
            },
            slock_enabled: false,
        });
        assert_eq!(
            app.handle_action(Action::ToggleSysupdates),
            Some(UiCommand::SwitchSysupdates(SysupdatesChannel::Dev))
        );
    }

    #[test]
    fn test_init_wallet_uses_offered_seed_once() {
        let mut app = make_app();
        assert_eq!(app.handle_action(Action::InitWallet), None);
        let seed = Mnemonic::new(vec!["abandon".into(); 24]);
        app.set_seed(&seed);
        assert_eq!(
            app.handle_action(Action::InitWallet),
            Some(UiCommand::InitWallet(seed))
        );
        assert_eq!(app.handle_action(Action::InitWallet), None);
    }

    #[test]
    fn test_poweroff_progress_freezes_input() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('p'));
        app.set_poweroff(&PowerOffProgress::default());
        assert_eq!(app.dialog, None);
        assert_eq!(app.handle_key(KeyCode::Char('q')), None);
    }

    #[test]
    fn test_lightning_report_clears_error() {
        let mut app = make_app();
        app.set_lightning_error(LightningErrorCode::Locked);
        app.set_lightning(&LightningReport::default());
        assert_eq!(app.lightning.error, None);
    }

    #[test]
    fn test_status_line_contains_panel_name() {
        let mut app = make_app();
        assert!(app.status_line().contains("[Bitcoin]"));
        app.handle_action(Action::NextPanel);
        assert!(app.status_line().contains("[Lightning]"));
    }
}
