//! In-memory daemon ↔ UI pipes.

use std::time::Duration;

use ndg_core::comm::{Message, MessageTag, ParsedMessage};
use ndg_core::transport::Transport;
use tokio::io::{DuplexStream, duplex};

/// One end of an in-memory pipe.
pub type PipeEnd = Transport<DuplexStream, DuplexStream>;

/// How long helpers wait for a frame before failing the test.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected `(daemon, ui)` pair: what one end writes, the other reads.
pub fn pipe_pair() -> (PipeEnd, PipeEnd) {
    let (nd_write, ui_read) = duplex(64 * 1024);
    let (ui_write, nd_read) = duplex(64 * 1024);
    (
        Transport::new(nd_read, nd_write),
        Transport::new(ui_read, ui_write),
    )
}

/// Read the next message, failing the test on error or timeout.
pub async fn next_message(end: &mut PipeEnd) -> ParsedMessage {
    tokio::time::timeout(READ_TIMEOUT, end.read())
        .await
        .expect("timed out waiting for a frame")
        .expect("frame failed to decode")
}

/// Skip messages until one with `tag` arrives.
pub async fn expect_message(end: &mut PipeEnd, tag: MessageTag) -> Message {
    loop {
        let msg = next_message(end).await;
        if msg.tag() == tag {
            return msg.into_value();
        }
        msg.release();
    }
}
