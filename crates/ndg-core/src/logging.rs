//! Logging setup shared by both binaries.
//!
//! Logs never go to stdout: the UI's stdout is the protocol pipe. The daemon
//! and a headless UI log to stderr through [`init`]. A UI that draws on the
//! terminal captures events with [`LogCollector`] instead, so log lines do
//! not tear the screen, and shows them in its log panel.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Errors installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {message}")]
    Filter { directive: String, message: String },

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

/// The filter directive for a `-v` count and the configured level.
pub fn filter_directive(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `RUST_LOG` if set, otherwise `directive`.
fn env_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|e| LoggingError::Filter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Install a `fmt` subscriber writing to stderr.
pub fn init(directive: &str) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directive)?)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Install a subscriber that only records into a ring buffer of `capacity`
/// entries, returning the reader for it.
pub fn init_collected(directive: &str, capacity: usize) -> Result<LogReader, LoggingError> {
    let collector = LogCollector::new(capacity);
    let reader = collector.reader();
    tracing_subscriber::registry()
        .with(collector.with_filter(env_filter(directive)?))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(reader)
}

/// A single captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Seconds since the collector was created.
    pub elapsed_secs: f64,
    pub level: Level,
    pub target: String,
    /// The message followed by its structured fields as `key=value`.
    pub message: String,
}

#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    start_time: Instant,
}

impl LogBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            start_time: Instant::now(),
        }
    }

    fn push(&mut self, level: Level, target: String, message: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
            level,
            target,
            message,
        });
    }
}

/// A `tracing` layer that captures events into a bounded ring buffer.
#[derive(Debug, Clone)]
pub struct LogCollector {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl LogCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::new(capacity))),
        }
    }

    pub fn reader(&self) -> LogReader {
        LogReader {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(
                *metadata.level(),
                metadata.target().to_string(),
                visitor.finish(),
            );
        }
    }
}

/// A read handle for the log buffer.
#[derive(Debug, Clone)]
pub struct LogReader {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl LogReader {
    /// Snapshot of all captured entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The newest `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|buf| {
                let skip = buf.entries.len().saturating_sub(n);
                buf.entries.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run `f` with a collector of `capacity` as the default subscriber.
    fn collect(capacity: usize, f: impl FnOnce()) -> LogReader {
        let collector = LogCollector::new(capacity);
        let reader = collector.reader();
        tracing::subscriber::with_default(tracing_subscriber::registry().with(collector), f);
        reader
    }

    #[test]
    fn test_levels_and_targets_recorded() {
        let reader = collect(16, || {
            tracing::info!(target: "ndg::daemon", "UI process spawned");
            tracing::warn!(target: "ndg::transport", "Transport read failed");
        });

        let entries = reader.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::INFO);
        assert_eq!(entries[0].target, "ndg::daemon");
        assert_eq!(entries[1].level, Level::WARN);
        assert!(entries[0].elapsed_secs <= entries[1].elapsed_secs);
    }

    #[test]
    fn test_fields_follow_message() {
        let reader = collect(4, || {
            tracing::info!(service = "lnd", stopped = true, "Service stop finished");
        });
        assert_eq!(
            reader.entries()[0].message,
            "Service stop finished service=lnd stopped=true"
        );
    }

    #[test]
    fn test_oldest_entries_evicted() {
        let reader = collect(3, || {
            for height in 100..105 {
                tracing::debug!(height, "Chain tip");
            }
        });

        assert_eq!(reader.len(), 3);
        assert!(reader.entries()[0].message.ends_with("height=102"));
        let tail = reader.tail(1);
        assert!(tail[0].message.ends_with("height=104"));
        assert_eq!(reader.tail(10).len(), 3);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let reader = collect(0, || tracing::error!("dropped"));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_filter_directive_from_verbosity() {
        assert_eq!(filter_directive(0, "warn"), "warn");
        assert_eq!(filter_directive(1, "warn"), "debug");
        assert_eq!(filter_directive(3, "warn"), "trace");
    }
}
