//! Framing errors.

use std::io;

use thiserror::Error;

/// Errors raised while reading or writing framed messages.
#[derive(Debug, Error)]
pub enum FramingError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended part-way through a message.
    #[error("stream closed with {buffered} bytes of an incomplete message")]
    UnexpectedEof {
        /// Bytes buffered when the stream ended.
        buffered: usize,
    },

    /// The header block carried no `Content-Length`.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// The header block was not valid UTF-8.
    #[error("invalid header format")]
    InvalidHeader,

    /// The `Content-Length` value was not a non-negative integer.
    #[error("invalid Content-Length value '{value}'")]
    InvalidContentLength {
        /// Raw header value.
        value: String,
    },

    /// No header terminator appeared within the header size limit.
    #[error("header exceeds {limit} bytes without a terminator")]
    HeaderTooLarge {
        /// Maximum header size.
        limit: usize,
    },

    /// The announced body exceeds the message size limit.
    #[error("message of {length} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Announced body length.
        length: usize,
        /// Maximum body length.
        limit: usize,
    },

    /// Encoding an outgoing message failed.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// A previous writer panicked while holding the stream.
    #[error("message writer lock poisoned")]
    Poisoned,
}
