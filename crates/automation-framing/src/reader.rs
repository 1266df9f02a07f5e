//! Buffered reader for framed messages.

use std::io::{ErrorKind, Read};

use crate::error::FramingError;

/// Largest accepted message body.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Largest accepted header block, terminator excluded.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "content-length:";
const READ_CHUNK: usize = 4096;

/// Reads framed messages from a byte stream.
///
/// Bytes read past the end of one message stay buffered for the next call.
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> MessageReader<R> {
    /// Wraps a byte stream.
    #[must_use]
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    /// Blocks until a complete message is buffered and returns its body.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between messages.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::UnexpectedEof`] when the stream ends inside a
    /// message, a header error when the header block is malformed, and
    /// [`FramingError::Io`] when reading fails.
    pub fn next_message(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        loop {
            if let Some(body) = self.take_buffered()? {
                return Ok(Some(body));
            }

            let mut chunk = [0_u8; READ_CHUNK];
            let read = read_with_retry(&mut self.inner, &mut chunk)?;
            if read == 0 {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(FramingError::UnexpectedEof {
                        buffered: self.buffer.len(),
                    })
                };
            }
            self.buffer
                .extend_from_slice(chunk.get(..read).unwrap_or_default());
        }
    }

    /// Bytes received but not yet returned as a message.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn take_buffered(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        let Some(header_end) = find_terminator(&self.buffer) else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                return Err(FramingError::HeaderTooLarge {
                    limit: MAX_HEADER_BYTES,
                });
            }
            return Ok(None);
        };

        let header = self.buffer.get(..header_end).unwrap_or_default();
        let length = parse_content_length(header)?;
        if length > MAX_MESSAGE_BYTES {
            return Err(FramingError::MessageTooLarge {
                length,
                limit: MAX_MESSAGE_BYTES,
            });
        }

        let body_start = header_end + HEADER_TERMINATOR.len();
        let body_end = body_start + length;
        let Some(body) = self.buffer.get(body_start..body_end) else {
            return Ok(None);
        };
        let body = body.to_vec();
        self.buffer.drain(..body_end);
        Ok(Some(body))
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

fn parse_content_length(header: &[u8]) -> Result<usize, FramingError> {
    let text = std::str::from_utf8(header).map_err(|_| FramingError::InvalidHeader)?;
    for line in text.split("\r\n") {
        let Some(prefix) = line.get(..CONTENT_LENGTH.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(CONTENT_LENGTH) {
            continue;
        }
        let value = line.get(CONTENT_LENGTH.len()..).unwrap_or_default().trim();
        return value
            .parse()
            .map_err(|_| FramingError::InvalidContentLength {
                value: value.to_owned(),
            });
    }
    Err(FramingError::MissingContentLength)
}

fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FramingError> {
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(FramingError::Io(error)),
        }
    }
}
