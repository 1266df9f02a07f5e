//! JSON-RPC envelopes exchanged with daemon clients.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::response::AutomationResponse;

/// Protocol version stamped on every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier as supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl RequestId {
    /// Identifier used when a request could not be decoded.
    #[must_use]
    pub fn unknown() -> Self {
        Self::Text("unknown".to_owned())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(formatter, "{id}"),
            Self::Text(id) => formatter.write_str(id),
        }
    }
}

/// Decoded client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Protocol version declared by the client.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Client-chosen identifier echoed in the response.
    pub id: RequestId,
    /// Method name.
    pub method: String,
    /// Named parameters; `null` and absent are both empty.
    #[serde(default, deserialize_with = "params_or_null")]
    pub params: Map<String, Value>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_owned()
}

fn params_or_null<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RequestEnvelope {
    /// Builds a request with no parameters.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            method: method.into(),
            params: Map::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Decodes a request from raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when the bytes are not a valid envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Looks up a string parameter.
    #[must_use]
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Direct response to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Protocol version.
    pub jsonrpc: String,
    /// Identifier of the request being answered.
    pub id: RequestId,
    /// Outcome of the request.
    pub result: AutomationResponse,
}

impl ResponseEnvelope {
    /// Wraps a result for the request with identifier `id`.
    #[must_use]
    pub fn new(id: RequestId, result: AutomationResponse) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result,
        }
    }
}

/// Opaque client-chosen name of a stream subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamToken(String);

impl StreamToken {
    /// Wraps a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Discriminator of a pushed [`StreamEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamEventKind {
    /// A fresh snapshot.
    Snapshot,
    /// A diff against the previous tick.
    Diff,
    /// A higher-level change signal.
    Signal,
    /// A tick failed.
    Error,
}

/// Event pushed to a client outside the request/response flow.
///
/// Clients tell events from responses by the `event` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Subscription the event belongs to.
    pub token: StreamToken,
    /// Event discriminator.
    pub event: StreamEventKind,
    /// Event payload.
    pub data: Value,
}

impl StreamEvent {
    /// Builds an event from a serialisable payload.
    ///
    /// # Errors
    ///
    /// Returns the encoding error when `data` cannot be represented as JSON.
    pub fn new<T: Serialize + ?Sized>(
        token: StreamToken,
        event: StreamEventKind,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            token,
            event,
            data: serde_json::to_value(data)?,
        })
    }
}
