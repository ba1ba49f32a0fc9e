//! UI runtime coordinator.
//!
//! A [`UiRuntime`] owns the display state (`Mode`, [`LastReportCache`] and
//! the [`Screen`]) behind one lock and runs two workers over it: a render
//! worker that ticks the screen and handles idle standby, and a
//! communication worker that serves the daemon pipe and the screen's
//! [`UiCommand`]s.

pub mod cache;
pub mod mode;
pub mod runtime;
pub mod screen;

pub use cache::{LastReportCache, ReportKind};
pub use mode::Mode;
pub use runtime::{UiRuntime, UiState};
pub use screen::{COMMAND_QUEUE, Screen, UiCommand, command_channel, show_message};
