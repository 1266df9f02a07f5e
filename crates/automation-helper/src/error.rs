//! Error types for the helper bridge and helper service.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use automation_framing::FramingError;
use thiserror::Error;

use crate::app::HelperApp;

/// Errors raised while running or talking to helper processes.
#[derive(Debug, Clone, Error)]
pub enum HelperError {
    /// The helper executable was not found.
    #[error("helper binary not found: {command}")]
    BinaryNotFound {
        /// The command that was not found.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Failed to spawn the helper process.
    #[error("failed to spawn helper process: {message}")]
    SpawnFailed {
        /// Description of the spawn failure.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// No executable is configured for the app.
    #[error("no helper configured for {app}")]
    NotConfigured {
        /// Application without a helper.
        app: HelperApp,
    },

    /// Framing failure on the helper pipes.
    #[error("helper transport error: {0}")]
    Framing(#[source] Arc<FramingError>),

    /// The connection closed before a reply arrived.
    #[error("helper connection closed")]
    Closed,

    /// The helper answered without a usable payload.
    #[error("helper returned no usable reply")]
    NoReply,

    /// No reply arrived within the deadline.
    #[error("helper did not reply within {}ms", timeout.as_millis())]
    Timeout {
        /// Deadline that elapsed.
        timeout: Duration,
    },
}

impl From<FramingError> for HelperError {
    fn from(error: FramingError) -> Self {
        Self::Framing(Arc::new(error))
    }
}
