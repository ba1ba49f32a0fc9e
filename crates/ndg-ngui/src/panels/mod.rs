//! Terminal screen panels.

pub mod bitcoin;
mod lightning;
mod logs;
pub mod settings;

pub use lightning::LightningPanel;
pub use logs::LogsPanel;

/// Trait for panels that support scrolling.
pub trait PanelState {
    /// Scroll down by `n` lines.
    fn scroll_down(&mut self, n: usize);

    /// Scroll up by `n` lines.
    fn scroll_up(&mut self, n: usize);

    /// Scroll to the very top.
    fn scroll_to_top(&mut self);

    /// Scroll to the very bottom.
    fn scroll_to_bottom(&mut self);
}

/// Format a satoshi amount with thousands separators.
pub fn format_sats(sats: i64) -> String {
    let digits = sats.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if sats < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
