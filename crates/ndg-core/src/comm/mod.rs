//! The daemon ↔ UI wire protocol.
//!
//! Every message is one frame:
//!
//! ```text
//! ┌────────────┬────────────────┬──────────────────────────┐
//! │ tag u16 LE │ length u64 LE  │ compact UTF-8 JSON       │
//! │ (2 bytes)  │ (8 bytes)      │ (`length` bytes, may be 0)│
//! └────────────┴────────────────┴──────────────────────────┘
//! ```
//!
//! [`tag`] holds the stable ordinals, [`payload`] the JSON shapes,
//! [`message`] the typed union, and [`codec`] the pure encode/decode
//! functions. Reading and writing frames on a stream lives in
//! [`crate::transport`].

pub mod codec;
pub mod message;
pub mod payload;
pub mod tag;

pub use codec::{
    HEADER_LEN, MAX_FRAME_LEN, RawFrame, decode, decode_bytes, encode, split_frame,
    split_frame_max,
};
pub use message::{Message, ParsedMessage};
pub use tag::MessageTag;

/// Errors from encoding, decoding, or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    #[error("invalid message tag {0:#06x}")]
    InvalidTag(u16),

    #[error("zero-length payload for message {0}")]
    ZeroLenInNonVoidTag(MessageTag),

    #[error("payload of {0} bytes is too large to frame")]
    WriteTooLarge(usize),

    #[error("frame length {0} exceeds the frame size limit")]
    FrameTooLarge(u64),

    #[error("malformed {tag} payload: {source}")]
    Payload {
        tag: MessageTag,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {tag} payload: {source}")]
    Encode {
        tag: MessageTag,
        #[source]
        source: serde_json::Error,
    },

    #[error("end of stream")]
    EndOfStream,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommError {
    /// Whether the peer closed its end of the pipe.
    ///
    /// This is the only read error that ends a read loop; every other error
    /// is logged and the loop continues.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            CommError::EndOfStream => true,
            CommError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
