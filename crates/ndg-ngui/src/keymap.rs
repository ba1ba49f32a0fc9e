//! Keybindings for the terminal screen.
//!
//! Prompts and dialogs consume keys before the keymap sees them, so every
//! binding here applies to the panel view only.

use crossterm::event::KeyCode;

/// An action the terminal screen can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextPanel,
    PrevPanel,
    GoToPanel(usize),
    ScrollDown,
    ScrollUp,
    ScrollToTop,
    ScrollToBottom,
    /// Ask the daemon for a fresh network report.
    Refresh,
    /// Same, scanning for wifi networks first.
    Scan,
    JoinWifi,
    PowerOff,
    Rename,
    ToggleSysupdates,
    SetPincode,
    CtrlConn,
    /// Create the wallet from the offered seed.
    InitWallet,
    ResetWallet,
    None,
}

/// Single-key node actions. Upper-case keys guard the disruptive ones.
const NODE_KEYS: &[(char, Action)] = &[
    ('r', Action::Refresh),
    ('s', Action::Scan),
    ('w', Action::JoinWifi),
    ('p', Action::PowerOff),
    ('N', Action::Rename),
    ('u', Action::ToggleSysupdates),
    ('P', Action::SetPincode),
    ('c', Action::CtrlConn),
    ('i', Action::InitWallet),
    ('X', Action::ResetWallet),
];

/// Turns key presses into [`Action`]s. `gg` is the only two-key binding.
#[derive(Debug, Default)]
pub struct Keymap {
    /// Set after a lone `g`.
    g_prefix: bool,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve one key press. A `g` not followed by another `g` is dropped
    /// and the following key is resolved on its own.
    pub fn map(&mut self, key: KeyCode) -> Action {
        if std::mem::take(&mut self.g_prefix) && key == KeyCode::Char('g') {
            return Action::ScrollToTop;
        }

        match key {
            KeyCode::Char('g') => {
                self.g_prefix = true;
                Action::None
            }
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Action::NextPanel,
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => Action::PrevPanel,
            KeyCode::Char(c @ '1'..='9') => Action::GoToPanel(c as usize - '1' as usize),
            KeyCode::Down | KeyCode::Char('j') => Action::ScrollDown,
            KeyCode::Up | KeyCode::Char('k') => Action::ScrollUp,
            KeyCode::End | KeyCode::Char('G') => Action::ScrollToBottom,
            KeyCode::Home => Action::ScrollToTop,
            KeyCode::Char(c) => NODE_KEYS
                .iter()
                .find(|(k, _)| *k == c)
                .map_or(Action::None, |(_, action)| *action),
            _ => Action::None,
        }
    }
}
