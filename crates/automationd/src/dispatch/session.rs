//! Per-connection request context.

use std::sync::Arc;

use automation_framing::FrameSink;

use crate::streams::SessionId;

/// The client connection a request arrived on.
///
/// Stream subscriptions started by the request push their events through
/// [`Session::writer`], interleaved with the connection's responses.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    writer: Arc<dyn FrameSink>,
}

impl Session {
    /// Creates a session with a fresh identifier.
    #[must_use]
    pub fn new(writer: Arc<dyn FrameSink>) -> Self {
        Self {
            id: SessionId::next(),
            writer,
        }
    }

    /// Identifier used to detach this session's streams.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Shared writer of the connection.
    #[must_use]
    pub fn writer(&self) -> Arc<dyn FrameSink> {
        Arc::clone(&self.writer)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}
