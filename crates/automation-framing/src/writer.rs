//! Serialised writer for framed messages.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::FramingError;

/// Prefixes `body` with its `Content-Length` header.
#[must_use]
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Destination for whole framed messages.
///
/// Implementations must write each frame atomically with respect to other
/// callers sharing the same sink.
pub trait FrameSink: Send + Sync {
    /// Writes one framed message.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame could not be written.
    fn send_raw(&self, body: &[u8]) -> Result<(), FramingError>;
}

/// Writes framed messages to a byte stream, one whole frame at a time.
#[derive(Debug)]
pub struct MessageWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write> MessageWriter<W> {
    /// Wraps a byte stream.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Writes one framed message and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Io`] when writing fails and
    /// [`FramingError::Poisoned`] when another writer panicked mid-frame.
    pub fn write_frame(&self, body: &[u8]) -> Result<(), FramingError> {
        let frame = encode_frame(body);
        let mut stream = self.inner.lock().map_err(|_| FramingError::Poisoned)?;
        stream.write_all(&frame)?;
        stream.flush()?;
        Ok(())
    }

    /// Encodes `value` as JSON and writes it as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Encode`] when encoding fails and any error
    /// from [`MessageWriter::write_frame`].
    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), FramingError> {
        let body = serde_json::to_vec(value)?;
        self.write_frame(&body)
    }

    /// Consumes the writer and returns the stream.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> FrameSink for MessageWriter<W> {
    fn send_raw(&self, body: &[u8]) -> Result<(), FramingError> {
        self.write_frame(body)
    }
}
