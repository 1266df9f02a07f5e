//! `Content-Length` message framing over byte streams.
//!
//! Both the daemon socket and the helper stdio pipes carry JSON messages in
//! the LSP framing:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! [`MessageReader`] owns a persistent buffer, so a payload may arrive across
//! any number of underlying reads and trailing bytes of the next message are
//! kept for the following call. [`MessageWriter`] serialises whole frames
//! behind a mutex so that concurrent writers never interleave.

mod error;
mod reader;
mod writer;

pub use error::FramingError;
pub use reader::{MAX_HEADER_BYTES, MAX_MESSAGE_BYTES, MessageReader};
pub use writer::{FrameSink, MessageWriter, encode_frame};
