//! Action requests targeting application elements.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::selector::Selector;

/// Kind of interaction requested by an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Press the target element.
    Click,
    /// Replace the target's value with `params.text`.
    SetValue,
    /// Send a key press with `params.keyCode` and optional `params.modifiers`.
    PressKey,
    /// Scroll by `params.deltaX`/`params.deltaY`.
    Scroll,
    /// Invoke a named accessibility action.
    Invoke,
    /// Choose a menu item.
    Menu,
    /// Navigate to `params.url`.
    OpenUrl,
    /// Dispatch a keyboard shortcut.
    Shortcut,
}

impl ActionKind {
    /// Wire name of the action kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::SetValue => "setValue",
            Self::PressKey => "pressKey",
            Self::Scroll => "scroll",
            Self::Invoke => "invoke",
            Self::Menu => "menu",
            Self::OpenUrl => "openUrl",
            Self::Shortcut => "shortcut",
        }
    }
}

/// Keyboard modifier accepted by `pressKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyModifier {
    /// Command key.
    Command,
    /// Shift key.
    Shift,
    /// Option/Alt key.
    Option,
    /// Control key.
    Control,
}

impl KeyModifier {
    /// Parses a modifier name, accepting common aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "command" | "cmd" => Some(Self::Command),
            "shift" => Some(Self::Shift),
            "option" | "alt" => Some(Self::Option),
            "control" | "ctrl" => Some(Self::Control),
            _ => None,
        }
    }
}

/// A request to interact with an element.
///
/// The target is resolved from `element_id` when present and from
/// `selector` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Interaction to perform.
    pub action: ActionKind,
    /// Selector resolving the target element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    /// Identifier of the target element from the latest snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Kind-specific parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl Action {
    /// Creates an action with no target or parameters.
    #[must_use]
    pub const fn new(action: ActionKind) -> Self {
        Self {
            action,
            selector: None,
            element_id: None,
            params: None,
        }
    }

    /// Targets an element by identifier.
    #[must_use]
    pub fn on_element(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    /// Targets the first element matching `selector`.
    #[must_use]
    pub fn on_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|params| params.get(key))
    }

    /// Looks up a string parameter.
    #[must_use]
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    /// Looks up an integer parameter.
    #[must_use]
    pub fn int_param(&self, key: &str) -> Option<i64> {
        self.param(key).and_then(Value::as_i64)
    }

    /// Parses `params.modifiers`, ignoring unknown names.
    #[must_use]
    pub fn modifiers(&self) -> Vec<KeyModifier> {
        self.param("modifiers")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(KeyModifier::parse)
                    .collect()
            })
            .unwrap_or_default()
    }
}
