#![deny(unsafe_code)]

//! ndg core: the coordination layer between the node daemon (`nd`) and its
//! touchscreen UI (`ngui`).
//!
//! The two processes talk over one anonymous pipe: the daemon spawns the UI
//! with piped stdin/stdout and both ends speak the framed protocol in
//! [`comm`] through a [`transport::Transport`]. [`daemon`] supervises the UI
//! and serves its requests; [`ui`] runs the UI's render and communication
//! workers over the display mode machine.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, the return type for async
/// trait methods that are called through `dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Wire protocol: tags, payloads, messages and framing.
pub mod comm;
/// UI supervisor, request dispatch and power-off sequencing.
pub mod daemon;
/// Subscriber setup and the in-memory log collector.
pub mod logging;
/// Termination signals and the shutdown broadcast.
pub mod signal;
/// Frame reader/writer over a byte stream, and the process-level bindings.
pub mod transport;
/// UI runtime: mode machine, report cache and the two workers.
pub mod ui;

pub use comm::{CommError, Message, MessageTag, ParsedMessage};
pub use daemon::{Collaborators, Daemon, DaemonError, DaemonState, StopReport};
pub use logging::{LogCollector, LogReader};
pub use signal::ShutdownSignal;
pub use transport::{FrameReader, FrameWriter, Transport, TransportError};
pub use ui::{Mode, Screen, UiCommand, UiRuntime};
