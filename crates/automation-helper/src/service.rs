//! Helper-side request loop.
//!
//! A helper executable wraps a [`HelperProvider`] in a [`HelperService`] and
//! serves framed requests from its stdin until the daemon closes the pipe.

use std::io::{Read, Write};

use automation_core::{
    Action, AutomationResponse, CapabilityProfile, ErrorCode, Snapshot, StreamToken,
};
use automation_framing::{MessageReader, MessageWriter};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::HelperError;
use crate::jsonrpc::{HelperReply, HelperRequest, INVALID_REQUEST, METHOD_NOT_FOUND, methods};

/// Log target for the helper-side service.
const SERVICE_TARGET: &str = "automation_helper::service";

/// Message returned for a `perform` request whose action does not decode.
pub const INVALID_ACTION_MESSAGE: &str = "Invalid action payload";

/// Application-specific automation backend run inside a helper process.
pub trait HelperProvider: Send + Sync {
    /// Application the helper serves.
    fn app_name(&self) -> &str;

    /// Reports which automation backends are viable.
    fn capabilities(&self) -> CapabilityProfile;

    /// Captures the application's accessibility tree.
    fn observe(&self) -> Snapshot;

    /// Performs an action.
    fn perform(&self, action: &Action) -> AutomationResponse;

    /// Starts helper-side streaming.
    fn start_stream(&self, interval_ms: u64, token: &StreamToken) -> bool;

    /// Stops helper-side streaming.
    fn stop_stream(&self, token: &StreamToken) -> bool;
}

#[derive(Deserialize)]
struct PerformParams {
    action: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartStreamParams {
    interval_ms: u64,
    token: StreamToken,
}

#[derive(Deserialize)]
struct StopStreamParams {
    token: StreamToken,
}

/// Serves helper requests against a [`HelperProvider`].
#[derive(Debug)]
pub struct HelperService<P> {
    provider: P,
    request_limit: Option<usize>,
}

impl<P: HelperProvider> HelperService<P> {
    /// Wraps a provider.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            request_limit: None,
        }
    }

    /// Stops serving after `limit` requests.
    #[must_use]
    pub const fn with_request_limit(mut self, limit: usize) -> Self {
        self.request_limit = Some(limit);
        self
    }

    /// The wrapped provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Reads requests from `input` and writes replies to `output` until the
    /// input closes or the request limit is reached.
    ///
    /// Returns the number of requests answered.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Framing`] when the input is not validly framed
    /// or a reply cannot be written.
    pub fn serve<R: Read, W: Write>(&self, input: R, output: W) -> Result<usize, HelperError> {
        let mut reader = MessageReader::new(input);
        let writer = MessageWriter::new(output);
        let mut served = 0_usize;

        while self.request_limit.is_none_or(|limit| served < limit) {
            let Some(body) = reader.next_message()? else {
                debug!(target: SERVICE_TARGET, served, "request stream closed");
                break;
            };
            let reply = self.handle_bytes(&body);
            writer.write_json(&reply)?;
            served += 1;
        }
        Ok(served)
    }

    /// Answers one raw request body.
    #[must_use]
    pub fn handle_bytes(&self, body: &[u8]) -> HelperReply {
        match serde_json::from_slice::<HelperRequest>(body) {
            Ok(request) => self.handle(&request),
            Err(error) => {
                warn!(target: SERVICE_TARGET, error = %error, "undecodable request");
                HelperReply::error(None, INVALID_REQUEST, "Invalid request")
            }
        }
    }

    /// Answers one decoded request.
    #[must_use]
    pub fn handle(&self, request: &HelperRequest) -> HelperReply {
        debug!(
            target: SERVICE_TARGET,
            app = self.provider.app_name(),
            method = %request.method,
            id = request.id,
            "handling request"
        );
        let result = match request.method.as_str() {
            methods::CAPABILITIES => serde_json::to_value(self.provider.capabilities()),
            methods::OBSERVE => serde_json::to_value(self.provider.observe()),
            methods::PERFORM => serde_json::to_value(self.perform(request.params.as_ref())),
            methods::START_STREAM => {
                match decode_params::<StartStreamParams>(request.params.as_ref()) {
                    Some(params) => Ok(Value::Bool(
                        self.provider
                            .start_stream(params.interval_ms, &params.token),
                    )),
                    None => return invalid_params(request.id),
                }
            }
            methods::STOP_STREAM => {
                match decode_params::<StopStreamParams>(request.params.as_ref()) {
                    Some(params) => Ok(Value::Bool(self.provider.stop_stream(&params.token))),
                    None => return invalid_params(request.id),
                }
            }
            other => {
                return HelperReply::error(
                    Some(request.id),
                    METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                );
            }
        };

        match result {
            Ok(value) => HelperReply::result(request.id, value),
            Err(error) => HelperReply::error(
                Some(request.id),
                INVALID_REQUEST,
                format!("failed to encode reply: {error}"),
            ),
        }
    }

    fn perform(&self, params: Option<&Value>) -> AutomationResponse {
        let action = decode_params::<PerformParams>(params)
            .and_then(|params| serde_json::from_value::<Action>(params.action).ok());
        match action {
            Some(action) => self.provider.perform(&action),
            None => AutomationResponse::failure(ErrorCode::InvalidRequest, INVALID_ACTION_MESSAGE),
        }
    }
}

fn decode_params<T: for<'de> Deserialize<'de>>(params: Option<&Value>) -> Option<T> {
    params.and_then(|value| T::deserialize(value).ok())
}

fn invalid_params(id: i64) -> HelperReply {
    HelperReply::error(Some(id), INVALID_REQUEST, "Invalid params")
}
