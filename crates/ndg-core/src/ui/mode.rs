//! Display-activity mode.

use std::fmt;

/// What the display is doing.
///
/// `Active → Standby` happens on input idle timeout, never from `Alert`.
/// `Standby → Active` happens on input or the wake signal. `Alert` is held
/// while a flow needs guaranteed visibility (power-off confirmation and
/// progress) and is left only when that flow dismisses it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Active,
    Standby,
    Alert,
}

impl Mode {
    /// Whether the idle timeout may put the screen to sleep.
    pub fn can_sleep(self) -> bool {
        self == Mode::Active
    }

    /// The mode to return to when leaving standby.
    pub fn woken(self) -> Mode {
        match self {
            Mode::Standby => Mode::Active,
            other => other,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Active => "active",
            Mode::Standby => "standby",
            Mode::Alert => "alert",
        };
        f.write_str(s)
    }
}
