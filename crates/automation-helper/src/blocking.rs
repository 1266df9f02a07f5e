//! Synchronous, deadline-bounded wrappers over [`HelperChannel`] calls.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use automation_core::{
    Action, AutomationResponse, CapabilityProfile, ErrorCode, Snapshot, StreamToken,
};
use tracing::warn;

use crate::bridge::BRIDGE_TARGET;
use crate::channel::{HelperChannel, Reply};
use crate::error::HelperError;

/// Deadline applied when the configuration does not override it.
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(5);

/// Message returned when a helper does not answer in time.
pub const HELPER_TIMEOUT_MESSAGE: &str = "Helper timeout";

/// Starts a callback-completing call and waits up to `timeout` for its
/// result.
///
/// A callback that fires after the deadline is discarded.
///
/// # Errors
///
/// Returns [`HelperError::Timeout`] when the callback does not fire in time
/// and [`HelperError::Closed`] when it is dropped without firing.
pub fn wait_for<T, F>(timeout: Duration, register: F) -> Result<T, HelperError>
where
    T: Send + 'static,
    F: FnOnce(Reply<T>),
{
    let (sender, receiver) = mpsc::sync_channel(1);
    register(Box::new(move |value| {
        // The receiver is gone once the caller has given up waiting.
        if sender.send(value).is_err() {
            warn!(target: BRIDGE_TARGET, "discarding late helper reply");
        }
    }));
    receiver.recv_timeout(timeout).map_err(|error| match error {
        RecvTimeoutError::Timeout => HelperError::Timeout { timeout },
        RecvTimeoutError::Disconnected => HelperError::Closed,
    })
}

/// Fetches a snapshot from the helper.
///
/// # Errors
///
/// Returns [`HelperError::Timeout`] when the helper does not answer in time
/// and [`HelperError::NoReply`] when it answers without a snapshot.
pub fn observe_within(
    channel: &dyn HelperChannel,
    timeout: Duration,
) -> Result<Snapshot, HelperError> {
    wait_for(timeout, |reply| channel.observe(reply))?.ok_or(HelperError::NoReply)
}

/// Fetches the helper's capability profile.
///
/// # Errors
///
/// Returns [`HelperError::Timeout`] when the helper does not answer in time
/// and [`HelperError::NoReply`] when it answers without a profile.
pub fn capabilities_within(
    channel: &dyn HelperChannel,
    timeout: Duration,
) -> Result<CapabilityProfile, HelperError> {
    wait_for(timeout, |reply| channel.capabilities(reply))?.ok_or(HelperError::NoReply)
}

/// Asks the helper to perform `action` and returns its response.
///
/// Any failure to obtain a response becomes an `actionFailed` response with
/// the message `"Helper timeout"`.
#[must_use]
pub fn perform_within(
    channel: &dyn HelperChannel,
    action: &Action,
    timeout: Duration,
) -> AutomationResponse {
    match wait_for(timeout, |reply| channel.perform(action, reply)) {
        Ok(Some(response)) => response,
        Ok(None) | Err(_) => {
            AutomationResponse::failure(ErrorCode::ActionFailed, HELPER_TIMEOUT_MESSAGE)
        }
    }
}

/// Starts helper-side streaming; `false` on refusal or timeout.
#[must_use]
pub fn start_stream_within(
    channel: &dyn HelperChannel,
    interval_ms: u64,
    token: &StreamToken,
    timeout: Duration,
) -> bool {
    wait_for(timeout, |reply| channel.start_stream(interval_ms, token, reply)).unwrap_or(false)
}

/// Stops helper-side streaming; `false` on refusal or timeout.
#[must_use]
pub fn stop_stream_within(
    channel: &dyn HelperChannel,
    token: &StreamToken,
    timeout: Duration,
) -> bool {
    wait_for(timeout, |reply| channel.stop_stream(token, reply)).unwrap_or(false)
}
