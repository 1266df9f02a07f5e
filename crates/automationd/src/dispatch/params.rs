//! Typed access to request parameters.
//!
//! Selectors and actions arrive as generic JSON. Decoding them through the
//! data model's serde representation both normalises and validates them.

use automation_core::{Action, RequestEnvelope, Selector, StreamToken};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::streams::DEFAULT_STREAM_INTERVAL_MS;

use super::errors::DispatchError;

pub(crate) fn app_name(request: &RequestEnvelope) -> Result<&str, DispatchError> {
    request.str_param("app").ok_or(DispatchError::MissingApp)
}

pub(crate) fn token(request: &RequestEnvelope) -> Result<StreamToken, DispatchError> {
    request
        .str_param("token")
        .map(StreamToken::new)
        .ok_or(DispatchError::MissingToken)
}

pub(crate) fn selector(request: &RequestEnvelope) -> Result<Selector, DispatchError> {
    typed_object(request, "selector").ok_or(DispatchError::MissingSelector)
}

pub(crate) fn action(request: &RequestEnvelope) -> Result<Action, DispatchError> {
    typed_object(request, "action").ok_or(DispatchError::MissingAction)
}

/// `params.interval_ms`, falling back to the default when absent or not a
/// non-negative integer.
pub(crate) fn interval_ms(request: &RequestEnvelope) -> u64 {
    request
        .params
        .get("interval_ms")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_STREAM_INTERVAL_MS)
}

fn typed_object<T: DeserializeOwned>(request: &RequestEnvelope, key: &str) -> Option<T> {
    let value = request.params.get(key).filter(|value| value.is_object())?;
    serde_json::from_value(value.clone()).ok()
}
