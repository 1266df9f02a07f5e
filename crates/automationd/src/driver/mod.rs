//! In-process observation and action backend.
//!
//! Accessibility tree traversal is platform code that lives outside this
//! crate. The daemon consumes it through [`ObservationProvider`] and layers
//! target resolution and parameter validation on top in [`InProcessDriver`].

mod in_process;

use automation_core::{AutomationResponse, ErrorCode, KeyModifier, Snapshot};

pub use self::in_process::InProcessDriver;

/// Message returned for applications that cannot be reached.
pub const APP_NOT_RUNNING_MESSAGE: &str = "App not running";

/// A running application resolved by [`ObservationProvider::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    /// Application name as requested by the client.
    pub name: String,
    /// Process identifier of the application.
    pub pid: i32,
}

impl AppTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(name: impl Into<String>, pid: i32) -> Self {
        Self {
            name: name.into(),
            pid,
        }
    }
}

/// Accessibility backend for applications running beside the daemon.
///
/// Element identifiers passed to the action methods come from the most
/// recent snapshot of the same target. Implementations report failures as
/// failed [`AutomationResponse`]s rather than panicking.
pub trait ObservationProvider: Send + Sync {
    /// Resolves a running application by name.
    fn connect(&self, app_name: &str) -> Option<AppTarget>;

    /// Captures the application's accessibility tree.
    fn observe(&self, target: &AppTarget) -> Snapshot;

    /// Presses an element.
    fn click(&self, target: &AppTarget, element_id: &str) -> AutomationResponse;

    /// Replaces an element's value with `text`.
    fn set_value(&self, target: &AppTarget, element_id: &str, text: &str) -> AutomationResponse;

    /// Sends a key press to the focused application.
    fn press_key(
        &self,
        target: &AppTarget,
        key_code: u16,
        modifiers: &[KeyModifier],
    ) -> AutomationResponse;

    /// Scrolls an element, or the application window when `element_id` is
    /// `None`.
    fn scroll(
        &self,
        target: &AppTarget,
        element_id: Option<&str>,
        delta_x: i32,
        delta_y: i32,
    ) -> AutomationResponse;
}

/// Provider for hosts without an accessibility backend.
///
/// Every application reports as not running, so in-process requests fail
/// with `notConnected` while helper-backed requests keep working.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProvider;

impl UnavailableProvider {
    fn not_running() -> AutomationResponse {
        AutomationResponse::failure(ErrorCode::NotConnected, APP_NOT_RUNNING_MESSAGE)
    }
}

impl ObservationProvider for UnavailableProvider {
    fn connect(&self, _app_name: &str) -> Option<AppTarget> {
        None
    }

    fn observe(&self, target: &AppTarget) -> Snapshot {
        Snapshot::new(target.name.clone(), target.pid, Vec::new())
    }

    fn click(&self, _target: &AppTarget, _element_id: &str) -> AutomationResponse {
        Self::not_running()
    }

    fn set_value(&self, _target: &AppTarget, _element_id: &str, _text: &str) -> AutomationResponse {
        Self::not_running()
    }

    fn press_key(
        &self,
        _target: &AppTarget,
        _key_code: u16,
        _modifiers: &[KeyModifier],
    ) -> AutomationResponse {
        Self::not_running()
    }

    fn scroll(
        &self,
        _target: &AppTarget,
        _element_id: Option<&str>,
        _delta_x: i32,
        _delta_y: i32,
    ) -> AutomationResponse {
        Self::not_running()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn unavailable_provider_reports_every_app_as_stopped() {
        let provider = UnavailableProvider;
        assert_eq!(provider.connect("Notes"), None);

        let target = AppTarget::new("Notes", 42);
        let response = provider.click(&target, "e1");
        assert!(!response.success);
        assert_eq!(response.error_code, Some(ErrorCode::NotConnected));
        assert!(provider.observe(&target).elements.is_empty());
    }
}
