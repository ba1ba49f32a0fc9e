//! Frame transport over a bidirectional byte stream.
//!
//! A [`Transport`] is split once into a [`FrameReader`], owned by the single
//! worker that reads, and a cloneable [`FrameWriter`] shared by every worker
//! that sends. The reader buffers bytes until a whole frame is present, so a
//! pending [`FrameReader::read`] can be dropped inside `tokio::select!`
//! without losing or splitting a frame.
//!
//! The OS-level bindings ([`Transport::stdio`] for the UI,
//! [`Transport::attach_child`] for the daemon) can be established once per
//! process. [`Transport::new`] binds arbitrary streams, e.g. an in-memory
//! `tokio::io::duplex` pair in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::trace;

use crate::comm::{self, CommError, Message, ParsedMessage};

const READ_CHUNK: usize = 8 * 1024;

static PROCESS_BOUND: AtomicBool = AtomicBool::new(false);

/// Errors binding a process-level transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("a process-level transport is already bound")]
    AlreadyBound,

    #[error("child process has no piped {0}")]
    NotPiped(&'static str),
}

fn bind_process() -> Result<(), TransportError> {
    PROCESS_BOUND
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(|_| ())
        .map_err(|_| TransportError::AlreadyBound)
}

/// A bound pair of byte streams carrying frames.
pub struct Transport<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

/// The UI's transport: frames arrive on stdin and leave on stdout.
pub type StdioTransport = Transport<Stdin, Stdout>;

/// The daemon's transport: frames arrive on the child's stdout and leave on
/// the child's stdin.
pub type ChildTransport = Transport<ChildStdout, ChildStdin>;

impl<R, W> Transport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(read: R, write: W) -> Self {
        Self {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        }
    }

    /// Cap the payload length accepted from the peer.
    pub fn with_max_frame_len(mut self, max_len: u64) -> Self {
        self.reader = self.reader.with_max_frame_len(max_len);
        self
    }

    /// Hand the read half to one worker and keep the write half for the rest.
    pub fn split(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }

    pub async fn read(&mut self) -> Result<ParsedMessage, CommError> {
        self.reader.read().await
    }

    pub async fn write(&self, msg: &Message) -> Result<(), CommError> {
        self.writer.write(msg).await
    }
}

impl Transport<Stdin, Stdout> {
    /// Bind this process's own standard streams.
    pub fn stdio() -> Result<Self, TransportError> {
        bind_process()?;
        Ok(Self::new(tokio::io::stdin(), tokio::io::stdout()))
    }
}

impl Transport<ChildStdout, ChildStdin> {
    /// Bind the piped standard streams of a spawned child.
    pub fn attach_child(child: &mut Child) -> Result<Self, TransportError> {
        if child.stdin.is_none() {
            return Err(TransportError::NotPiped("stdin"));
        }
        if child.stdout.is_none() {
            return Err(TransportError::NotPiped("stdout"));
        }
        bind_process()?;

        let stdin = child.stdin.take().ok_or(TransportError::NotPiped("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::NotPiped("stdout"))?;
        Ok(Self::new(stdout, stdin))
    }
}

/// The read half of a transport.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_frame_len: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            max_frame_len: comm::MAX_FRAME_LEN,
        }
    }

    /// Reject frames whose header announces more than `max_len` payload
    /// bytes instead of buffering them.
    pub fn with_max_frame_len(mut self, max_len: u64) -> Self {
        self.max_frame_len = max_len;
        self
    }

    /// Read the next message.
    ///
    /// Cancel-safe: bytes already received stay buffered for the next call.
    /// A frame that fails to decode (unknown tag, bad payload) is consumed
    /// whole before its error is returned, so the following frame is read
    /// normally. A header announcing an oversized payload fails with
    /// [`CommError::FrameTooLarge`] right away; only the header is dropped
    /// and the bytes after it are read as the next frame. Returns
    /// [`CommError::EndOfStream`] once the peer has closed its end.
    pub async fn read(&mut self) -> Result<ParsedMessage, CommError> {
        loop {
            let next = match comm::split_frame_max(&self.buf, self.max_frame_len) {
                Ok(Some((frame, used))) => Some((comm::decode(frame), used)),
                Ok(None) => None,
                Err(e) => {
                    self.buf.drain(..comm::HEADER_LEN);
                    return Err(e);
                }
            };
            if let Some((decoded, used)) = next {
                self.buf.drain(..used);
                if let Ok(msg) = &decoded {
                    trace!(tag = %msg.tag(), "Frame received");
                }
                return decoded;
            }

            self.buf.reserve(READ_CHUNK);
            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if !self.buf.is_empty() {
                    trace!(pending = self.buf.len(), "Stream closed mid-frame");
                }
                return Err(CommError::EndOfStream);
            }
        }
    }
}

/// The write half of a transport. Clones share the stream; each frame is
/// written whole while holding the lock, so frames never interleave.
pub struct FrameWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FrameWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Encode and send one message.
    ///
    /// Blocks while the peer is not reading (pipe backpressure). Callers must
    /// not cancel a pending write: a partially written frame corrupts the
    /// stream.
    pub async fn write(&self, msg: &Message) -> Result<(), CommError> {
        let frame = comm::encode(msg)?;
        let mut inner = self.inner.lock().await;
        inner.write_all(&frame).await?;
        inner.flush().await?;
        trace!(tag = %msg.tag(), len = frame.len(), "Frame sent");
        Ok(())
    }

    /// Close the write end. The peer's next read returns end-of-stream.
    pub async fn close(&self) -> Result<(), CommError> {
        let mut inner = self.inner.lock().await;
        inner.shutdown().await?;
        Ok(())
    }
}
