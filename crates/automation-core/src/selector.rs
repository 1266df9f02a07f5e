//! Declarative element predicates.

use serde::{Deserialize, Serialize};

use crate::element::{Bounds, Element};
use crate::snapshot::Snapshot;

/// How a [`SelectorField`] compares against element text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    /// Case-sensitive equality.
    #[default]
    Exact,
    /// Case-insensitive substring search.
    Contains,
}

/// A text constraint on one element attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorField {
    /// Text to compare against.
    pub value: String,
    /// Comparison mode.
    #[serde(default, rename = "match")]
    pub mode: MatchMode,
}

impl SelectorField {
    /// Builds an exact-match field.
    #[must_use]
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            mode: MatchMode::Exact,
        }
    }

    /// Builds a case-insensitive substring field.
    #[must_use]
    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            mode: MatchMode::Contains,
        }
    }

    /// Tests `candidate` against this field.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self.mode {
            MatchMode::Exact => candidate == self.value,
            MatchMode::Contains => candidate
                .to_lowercase()
                .contains(&self.value.to_lowercase()),
        }
    }
}

/// Optional limits on an element's rectangle.
///
/// `min_*` bound the rectangle's leading edges from below and `max_*` bound
/// its trailing edges from above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorBounds {
    /// Smallest allowed left edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_x: Option<f64>,
    /// Smallest allowed top edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_y: Option<f64>,
    /// Largest allowed right edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_x: Option<f64>,
    /// Largest allowed bottom edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_y: Option<f64>,
}

impl SelectorBounds {
    fn admits(&self, bounds: &Bounds) -> bool {
        self.min_x.is_none_or(|min| bounds.min_x >= min)
            && self.min_y.is_none_or(|min| bounds.min_y >= min)
            && self.max_x.is_none_or(|max| bounds.max_x <= max)
            && self.max_y.is_none_or(|max| bounds.max_y <= max)
    }
}

/// Match predicate over the elements of a snapshot.
///
/// Every constraint is optional. An empty selector matches every element,
/// subject to `limit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    /// Constraint on [`Element::role`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SelectorField>,
    /// Constraint on [`Element::title`]; a missing title compares as empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SelectorField>,
    /// Constraint on [`Element::value`]; a missing value compares as empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SelectorField>,
    /// Constraint on the breadcrumb [`Element::path`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<SelectorField>,
    /// Constraint on the title of the enclosing window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<SelectorField>,
    /// Rectangle limits; elements without bounds are not excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<SelectorBounds>,
    /// Required enabled state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Required focus state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    /// Maximum number of matches returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Selector {
    /// Returns the matching elements of `snapshot` in pre-order, truncated
    /// to `limit`.
    #[must_use]
    pub fn select(&self, snapshot: &Snapshot) -> Vec<Element> {
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut windows = WindowScope::default();
        let mut matches = Vec::new();
        for element in &snapshot.elements {
            if matches.len() >= limit {
                break;
            }
            let window_title = windows.enter(element);
            if self.matches(element, window_title) {
                matches.push(element.clone());
            }
        }
        matches
    }

    /// Returns the first matching element of `snapshot`.
    #[must_use]
    pub fn first(&self, snapshot: &Snapshot) -> Option<Element> {
        let single = Self {
            limit: Some(1),
            ..self.clone()
        };
        single.select(snapshot).into_iter().next()
    }

    /// Tests one element, given the title of its enclosing window.
    #[must_use]
    pub fn matches(&self, element: &Element, window_title: Option<&str>) -> bool {
        let text = |field: &Option<SelectorField>, candidate: &str| {
            field.as_ref().is_none_or(|field| field.matches(candidate))
        };
        text(&self.role, &element.role)
            && text(&self.title, element.title.as_deref().unwrap_or_default())
            && text(&self.value, element.value.as_deref().unwrap_or_default())
            && text(&self.path, &element.path)
            && text(&self.window, window_title.unwrap_or_default())
            && self.enabled.is_none_or(|enabled| enabled == element.enabled)
            && self.focused.is_none_or(|focused| focused == element.focused)
            && match (&self.bounds, &element.bounds) {
                (Some(limits), Some(bounds)) => limits.admits(bounds),
                _ => true,
            }
    }
}

/// Tracks enclosing windows during a pre-order walk.
#[derive(Default)]
struct WindowScope {
    stack: Vec<(usize, Option<String>)>,
}

impl WindowScope {
    /// Records `element` and returns the title of the window enclosing it.
    fn enter(&mut self, element: &Element) -> Option<&str> {
        let depth = element.depth();
        while self.stack.last().is_some_and(|(open, _)| *open >= depth) {
            self.stack.pop();
        }
        let enclosing = self.stack.len();
        if element.role.ends_with("Window") {
            self.stack.push((depth, element.title.clone()));
        }
        self.stack
            .get(..enclosing)
            .and_then(|open| open.last())
            .and_then(|(_, title)| title.as_deref())
    }
}
