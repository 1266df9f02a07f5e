//! JSON-RPC 2.0 messages exchanged with helper processes.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by helpers.
pub mod methods {
    /// Reports the helper's [`CapabilityProfile`](automation_core::CapabilityProfile).
    pub const CAPABILITIES: &str = "capabilities";
    /// Captures a [`Snapshot`](automation_core::Snapshot).
    pub const OBSERVE: &str = "observe";
    /// Performs `{action}`.
    pub const PERFORM: &str = "perform";
    /// Starts helper-side streaming for `{intervalMs, token}`.
    pub const START_STREAM: &str = "startStream";
    /// Stops helper-side streaming for `{token}`.
    pub const STOP_STREAM: &str = "stopStream";
}

/// Error code for a request naming an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32_601;

/// Error code for a request body that is not a valid request.
pub const INVALID_REQUEST: i64 = -32_600;

static REQUEST_ID: AtomicI64 = AtomicI64::new(1);

/// Generates a unique request ID.
///
/// IDs are monotonically increasing across every helper connection in the
/// process.
#[must_use]
pub fn next_request_id() -> i64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// A request sent to a helper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperRequest {
    /// Protocol version, always "2.0".
    pub jsonrpc: String,
    /// Request identifier echoed by the reply.
    pub id: i64,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl HelperRequest {
    /// Creates a request with an auto-generated ID.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::with_id(next_request_id(), method, params)
    }

    /// Creates a request with a specific ID.
    #[must_use]
    pub fn with_id(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A helper's answer to one [`HelperRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperReply {
    /// Protocol version.
    pub jsonrpc: String,
    /// Identifier of the request being answered; absent when the request
    /// could not be decoded.
    pub id: Option<i64>,
    /// The result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HelperReplyError>,
}

impl HelperReply {
    /// A successful reply.
    #[must_use]
    pub fn result(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// A failed reply.
    #[must_use]
    pub fn error(id: Option<i64>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(HelperReplyError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperReplyError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
