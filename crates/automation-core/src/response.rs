//! Results returned for every daemon request.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Machine-readable failure category carried by [`AutomationResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// The request was malformed or missing parameters.
    InvalidRequest,
    /// The backend cannot perform the requested action kind.
    UnsupportedAction,
    /// No element matched the requested target.
    ElementNotFound,
    /// The backend attempted the action and failed.
    ActionFailed,
    /// The operation did not complete in time.
    Timeout,
    /// The target application is not reachable.
    NotConnected,
    /// The selector was missing or malformed.
    InvalidSelector,
    /// Dry-run mode blocked an action.
    DryRunBlocked,
    /// No helper process could be reached for the application.
    HelperUnavailable,
}

impl ErrorCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalidRequest",
            Self::UnsupportedAction => "unsupportedAction",
            Self::ElementNotFound => "elementNotFound",
            Self::ActionFailed => "actionFailed",
            Self::Timeout => "timeout",
            Self::NotConnected => "notConnected",
            Self::InvalidSelector => "invalidSelector",
            Self::DryRunBlocked => "dryRunBlocked",
            Self::HelperUnavailable => "helperUnavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of a request, suitable for direct display to an operator.
///
/// Every response carries a `message`, including failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// Human-readable outcome.
    pub message: String,
    /// Suggestion for recovering from a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_hint: Option<String>,
    /// Reserved for higher-level change signals.
    #[serde(default)]
    pub signals: Vec<String>,
    /// Whether the observed UI changed, for diff-style requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    /// Request-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AutomationResponse {
    /// A successful response.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error_code: None,
            message: message.into(),
            retry_hint: None,
            signals: Vec::new(),
            changed: None,
            data: None,
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: Some(code),
            ..Self::success(message)
        }
    }

    /// Attaches a serialisable payload.
    ///
    /// A payload that cannot be encoded turns the response into an
    /// `actionFailed` failure.
    #[must_use]
    pub fn with_data<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => {
                self.data = Some(value);
                self
            }
            Err(error) => Self::failure(
                ErrorCode::ActionFailed,
                format!("failed to encode response data: {error}"),
            ),
        }
    }

    /// Sets the `changed` flag.
    #[must_use]
    pub const fn with_changed(mut self, changed: bool) -> Self {
        self.changed = Some(changed);
        self
    }

    /// Sets the retry hint.
    #[must_use]
    pub fn with_retry_hint(mut self, hint: impl Into<String>) -> Self {
        self.retry_hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn success_omits_absent_fields() {
        let json = serde_json::to_value(AutomationResponse::success("ok")).expect("serialise");
        assert_eq!(
            json,
            json!({ "success": true, "message": "ok", "signals": [] })
        );
    }

    #[rstest]
    fn failure_serialises_camel_case_code() {
        let response = AutomationResponse::failure(ErrorCode::DryRunBlocked, "blocked")
            .with_retry_hint("disable dry-run");
        let json = serde_json::to_value(response).expect("serialise");
        assert_eq!(json["success"], false);
        assert_eq!(json["errorCode"], "dryRunBlocked");
        assert_eq!(json["retryHint"], "disable dry-run");
    }

    #[rstest]
    #[case(ErrorCode::InvalidRequest)]
    #[case(ErrorCode::HelperUnavailable)]
    #[case(ErrorCode::NotConnected)]
    fn display_matches_wire_name(#[case] code: ErrorCode) {
        let wire = serde_json::to_value(code).expect("serialise code");
        assert_eq!(wire, json!(code.to_string()));
    }

    #[rstest]
    fn data_and_changed_are_carried() {
        let response = AutomationResponse::success("Observed")
            .with_data(&json!({ "elements": [] }))
            .with_changed(true);
        assert_eq!(response.changed, Some(true));
        assert_eq!(response.data, Some(json!({ "elements": [] })));
    }
}
