//! Target resolution and parameter checks for in-process actions.

use std::sync::Arc;

use automation_core::{
    Action, ActionKind, AutomationResponse, Element, ErrorCode, Selector, Snapshot,
};

use super::{AppTarget, ObservationProvider};

const MISSING_TEXT: &str = "Missing text parameter";
const MISSING_KEY_CODE: &str = "Missing keyCode parameter";
const MISSING_TARGET: &str = "Missing selector or elementId";
const NO_MATCH: &str = "No matching element";
const NEEDS_HELPER: &str = "Action requires app-specific handler";

/// Why an action's target element could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetError {
    NoMatch,
    Missing,
}

impl TargetError {
    fn into_response(self) -> AutomationResponse {
        match self {
            Self::NoMatch => AutomationResponse::failure(ErrorCode::ElementNotFound, NO_MATCH),
            Self::Missing => AutomationResponse::failure(ErrorCode::InvalidSelector, MISSING_TARGET),
        }
    }
}

/// Observes and acts on applications through an [`ObservationProvider`].
#[derive(Clone)]
pub struct InProcessDriver {
    provider: Arc<dyn ObservationProvider>,
}

impl InProcessDriver {
    /// Wraps a provider.
    #[must_use]
    pub fn new(provider: Arc<dyn ObservationProvider>) -> Self {
        Self { provider }
    }

    /// Resolves a running application by name.
    #[must_use]
    pub fn connect(&self, app_name: &str) -> Option<AppTarget> {
        self.provider.connect(app_name)
    }

    /// Captures a fresh snapshot of `target`.
    #[must_use]
    pub fn observe(&self, target: &AppTarget) -> Snapshot {
        self.provider.observe(target)
    }

    /// Captures a fresh snapshot and returns the elements matching
    /// `selector`.
    #[must_use]
    pub fn find(&self, target: &AppTarget, selector: &Selector) -> Vec<Element> {
        selector.select(&self.observe(target))
    }

    /// Performs `action` against `target`.
    ///
    /// Only `click`, `setValue`, `pressKey` and `scroll` run in process; the
    /// remaining kinds fail with `unsupportedAction`.
    #[must_use]
    pub fn perform(&self, target: &AppTarget, action: &Action) -> AutomationResponse {
        match action.action {
            ActionKind::Click => match self.resolve(target, action) {
                Ok(element_id) => self.provider.click(target, &element_id),
                Err(error) => error.into_response(),
            },
            ActionKind::SetValue => self.set_value(target, action),
            ActionKind::PressKey => self.press_key(target, action),
            ActionKind::Scroll => self.scroll(target, action),
            ActionKind::Invoke | ActionKind::Menu | ActionKind::OpenUrl | ActionKind::Shortcut => {
                AutomationResponse::failure(ErrorCode::UnsupportedAction, NEEDS_HELPER)
            }
        }
    }

    fn set_value(&self, target: &AppTarget, action: &Action) -> AutomationResponse {
        let Some(text) = action.str_param("text") else {
            return AutomationResponse::failure(ErrorCode::InvalidRequest, MISSING_TEXT);
        };
        match self.resolve(target, action) {
            Ok(element_id) => self.provider.set_value(target, &element_id, text),
            Err(error) => error.into_response(),
        }
    }

    fn press_key(&self, target: &AppTarget, action: &Action) -> AutomationResponse {
        let Some(key_code) = action
            .int_param("keyCode")
            .and_then(|code| u16::try_from(code).ok())
        else {
            return AutomationResponse::failure(ErrorCode::InvalidRequest, MISSING_KEY_CODE);
        };
        self.provider
            .press_key(target, key_code, &action.modifiers())
    }

    fn scroll(&self, target: &AppTarget, action: &Action) -> AutomationResponse {
        let delta = |key: &str| {
            action
                .int_param(key)
                .and_then(|value| i32::try_from(value).ok())
                .unwrap_or_default()
        };
        let (delta_x, delta_y) = (delta("deltaX"), delta("deltaY"));
        match self.resolve(target, action) {
            Ok(element_id) => self
                .provider
                .scroll(target, Some(&element_id), delta_x, delta_y),
            // Scrolling without a target scrolls the application itself.
            Err(TargetError::Missing) => self.provider.scroll(target, None, delta_x, delta_y),
            Err(error) => error.into_response(),
        }
    }

    /// Picks the action's element: `elementId` first, then the first
    /// selector match in a fresh snapshot.
    fn resolve(&self, target: &AppTarget, action: &Action) -> Result<String, TargetError> {
        if let Some(element_id) = &action.element_id {
            return Ok(element_id.clone());
        }
        let selector = action.selector.as_ref().ok_or(TargetError::Missing)?;
        selector
            .first(&self.observe(target))
            .map(|element| element.id)
            .ok_or(TargetError::NoMatch)
    }
}

impl std::fmt::Debug for InProcessDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessDriver").finish_non_exhaustive()
    }
}
