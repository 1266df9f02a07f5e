//! Request failures and their wire representation.
//!
//! Every variant renders to the operator-facing message carried in the
//! failed [`AutomationResponse`]; [`DispatchError::code`] picks the
//! machine-readable category.

use automation_core::{AutomationResponse, ErrorCode};
use automation_helper::HelperError;
use thiserror::Error;

/// Reasons a request could not be served.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The body was not a decodable request envelope.
    #[error("Invalid JSON-RPC payload")]
    InvalidPayload,

    /// The method name is not part of the protocol.
    #[error("Unknown method")]
    UnknownMethod {
        /// Method named by the client.
        method: String,
    },

    /// Dry-run mode blocks every action-performing method.
    #[error("Dry-run enabled; actions are blocked")]
    DryRun,

    /// `params.app` was absent or not a string.
    #[error("Missing app name")]
    MissingApp,

    /// `params.token` was absent or not a string.
    #[error("Missing token")]
    MissingToken,

    /// `params.selector` was absent or not a valid selector.
    #[error("Missing selector")]
    MissingSelector,

    /// `params.action` was absent or not a valid action.
    #[error("Missing action")]
    MissingAction,

    /// The in-process driver could not find the application.
    #[error("App not running")]
    AppNotRunning,

    /// The application has no helper.
    #[error("Unsupported app")]
    UnsupportedApp,

    /// The helper could not be started or reached.
    #[error("Helper unavailable")]
    HelperUnavailable,

    /// The stream's tick thread could not be started.
    #[error("Stream failed to start")]
    StreamStart {
        /// Token of the stream.
        token: String,
    },

    /// The helper did not produce a usable reply.
    #[error("Helper timeout")]
    Helper(#[source] HelperError),
}

impl DispatchError {
    /// Wire error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPayload
            | Self::UnknownMethod { .. }
            | Self::MissingApp
            | Self::MissingToken
            | Self::MissingAction => ErrorCode::InvalidRequest,
            Self::DryRun => ErrorCode::DryRunBlocked,
            Self::MissingSelector => ErrorCode::InvalidSelector,
            Self::AppNotRunning | Self::UnsupportedApp => ErrorCode::NotConnected,
            Self::HelperUnavailable => ErrorCode::HelperUnavailable,
            Self::StreamStart { .. } | Self::Helper(_) => ErrorCode::ActionFailed,
        }
    }

    /// Renders the failure as a response.
    #[must_use]
    pub fn to_response(&self) -> AutomationResponse {
        AutomationResponse::failure(self.code(), self.to_string())
    }
}

impl From<HelperError> for DispatchError {
    fn from(source: HelperError) -> Self {
        Self::Helper(source)
    }
}
