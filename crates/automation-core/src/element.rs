//! Flattened accessibility-tree nodes.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Separator placed between ancestor roles in [`Element::path`].
pub const PATH_SEPARATOR: &str = " > ";

/// Number of characters retained from an element value before truncation.
pub const MAX_VALUE_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Screen rectangle occupied by an element.
///
/// Equality and hashing compare the raw bit patterns of the coordinates so
/// that elements can live in hash sets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Left edge.
    pub min_x: f64,
    /// Top edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub max_y: f64,
}

impl Bounds {
    /// Builds a rectangle from its edges.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn bits(&self) -> [u64; 4] {
        [
            self.min_x.to_bits(),
            self.min_y.to_bits(),
            self.max_x.to_bits(),
            self.max_y.to_bits(),
        ]
    }
}

impl PartialEq for Bounds {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Bounds {}

impl Hash for Bounds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// One node of an application's accessibility tree.
///
/// Two elements are equal only when every field matches; the diff algorithm
/// relies on this to detect additions and removals with set arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    /// Identifier unique within the snapshot that produced the element.
    pub id: String,
    /// Accessibility role, for example `Button`.
    pub role: String,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Current value, truncated to [`MAX_VALUE_CHARS`] characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Whether the element accepts interaction.
    pub enabled: bool,
    /// Whether the element holds keyboard focus.
    pub focused: bool,
    /// Ancestor roles joined by [`PATH_SEPARATOR`].
    pub path: String,
    /// On-screen rectangle, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Names of the actions the element advertises, in provider order.
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Element {
    /// Creates an enabled, unfocused element with no optional attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, role: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            title: None,
            value: None,
            enabled: true,
            focused: false,
            path: path.into(),
            bounds: None,
            actions: Vec::new(),
        }
    }

    /// Sets the element title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the element value, truncating long values.
    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(truncate_value(value));
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the focused flag.
    #[must_use]
    pub const fn with_focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Sets the element bounds.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sets the advertised actions.
    #[must_use]
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Number of ancestors recorded in the breadcrumb path.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.path.is_empty() {
            0
        } else {
            self.path.split(PATH_SEPARATOR).count()
        }
    }

    /// Builds the breadcrumb for a child of this element.
    #[must_use]
    pub fn child_path(&self) -> String {
        if self.path.is_empty() {
            self.role.clone()
        } else {
            format!("{}{PATH_SEPARATOR}{}", self.path, self.role)
        }
    }
}

/// Truncates a value to [`MAX_VALUE_CHARS`] characters, appending an ellipsis
/// marker when anything was cut.
#[must_use]
pub fn truncate_value(value: &str) -> String {
    match value.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => {
            let mut truncated = value.get(..cut).unwrap_or(value).to_owned();
            truncated.push_str(ELLIPSIS);
            truncated
        }
        None => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("short", "short")]
    #[case("", "")]
    fn short_values_are_untouched(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(truncate_value(input), expected);
    }

    #[rstest]
    fn long_values_are_truncated_with_marker() {
        let input = "x".repeat(MAX_VALUE_CHARS + 20);
        let truncated = truncate_value(&input);
        assert_eq!(truncated.chars().count(), MAX_VALUE_CHARS + ELLIPSIS.len());
        assert!(truncated.ends_with(ELLIPSIS));
    }

    #[rstest]
    fn value_exactly_at_limit_is_kept() {
        let input = "y".repeat(MAX_VALUE_CHARS);
        assert_eq!(truncate_value(&input), input);
    }

    #[rstest]
    fn truncation_respects_multibyte_characters() {
        let input = "é".repeat(MAX_VALUE_CHARS + 1);
        let truncated = truncate_value(&input);
        assert!(truncated.starts_with(&"é".repeat(MAX_VALUE_CHARS)));
        assert!(truncated.ends_with(ELLIPSIS));
    }

    #[rstest]
    fn equality_covers_every_field() {
        let base = Element::new("e1", "TextField", "Window").with_value("a");
        let edited = base.clone().with_value("b");
        assert_ne!(base, edited);

        let set: HashSet<Element> = [base.clone(), base.clone(), edited].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[rstest]
    fn bounds_hash_by_bit_pattern() {
        let a = Element::new("e1", "Button", "").with_bounds(Bounds::new(0.0, 0.0, 10.0, 10.0));
        let b = a.clone();
        let set: HashSet<Element> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    #[case("", 0)]
    #[case("Application", 1)]
    #[case("Application > Window > Group", 3)]
    fn depth_counts_path_segments(#[case] path: &str, #[case] expected: usize) {
        assert_eq!(Element::new("e", "Button", path).depth(), expected);
    }

    #[rstest]
    fn child_path_appends_role() {
        let window = Element::new("e2", "Window", "Application");
        assert_eq!(window.child_path(), "Application > Window");
        let root = Element::new("e1", "Application", "");
        assert_eq!(root.child_path(), "Application");
    }

    #[rstest]
    fn serialises_with_camel_case_bounds_and_skips_absent_fields() {
        let element = Element::new("e1", "Button", "Window")
            .with_bounds(Bounds::new(1.0, 2.0, 3.0, 4.0))
            .with_actions(["AXPress"]);
        let json = serde_json::to_value(&element).expect("serialise element");
        assert_eq!(json["bounds"]["minX"], 1.0);
        assert_eq!(json["bounds"]["maxY"], 4.0);
        assert!(json.get("title").is_none());
        assert_eq!(json["actions"][0], "AXPress");
    }
}
