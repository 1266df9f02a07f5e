//! Point-in-time captures of an application's accessibility tree.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::element::Element;

/// Number of digest bytes rendered into [`Snapshot::hash`].
const FINGERPRINT_BYTES: usize = 8;

/// Flattened accessibility tree of one application at one instant.
///
/// `elements` preserves pre-order traversal order. Identifiers are unique
/// within a snapshot but carry no meaning across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// RFC 3339 capture time in UTC.
    pub timestamp: String,
    /// Application the tree belongs to.
    pub app_name: String,
    /// Process identifier of the application.
    pub pid: i32,
    /// Identifier of the focused element, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_element: Option<String>,
    /// Elements in pre-order.
    pub elements: Vec<Element>,
    /// Content fingerprint over element ids, titles and values.
    pub hash: String,
}

impl Snapshot {
    /// Captures a snapshot stamped with the current time.
    #[must_use]
    pub fn new(app_name: impl Into<String>, pid: i32, elements: Vec<Element>) -> Self {
        Self::captured_at(current_timestamp(), app_name, pid, elements)
    }

    /// Captures a snapshot with an explicit timestamp.
    ///
    /// The focused element is the first element reporting focus.
    #[must_use]
    pub fn captured_at(
        timestamp: impl Into<String>,
        app_name: impl Into<String>,
        pid: i32,
        elements: Vec<Element>,
    ) -> Self {
        let focused_element = elements
            .iter()
            .find(|element| element.focused)
            .map(|element| element.id.clone());
        let hash = fingerprint(&elements);
        Self {
            timestamp: timestamp.into(),
            app_name: app_name.into(),
            pid,
            focused_element,
            elements,
            hash,
        }
    }

    /// Looks up an element by identifier.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// Returns `true` when both snapshots share a content fingerprint.
    ///
    /// Matching fingerprints are a cheap hint that nothing visible changed;
    /// they do not cover roles, paths or flags.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

/// Current UTC time formatted as RFC 3339.
#[must_use]
pub fn current_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

fn fingerprint(elements: &[Element]) -> String {
    let mut hasher = Sha256::new();
    for element in elements {
        hasher.update(element.id.as_bytes());
        hasher.update(b":");
        hasher.update(element.title.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b":");
        hasher.update(element.value.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .take(FINGERPRINT_BYTES)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn elements() -> Vec<Element> {
        vec![
            Element::new("e1", "Window", "Application").with_title("Notes"),
            Element::new("e2", "TextArea", "Application > Window")
                .with_value("hello")
                .with_focused(true),
            Element::new("e3", "Button", "Application > Window").with_title("Done"),
        ]
    }

    #[rstest]
    fn focused_element_is_first_focused(elements: Vec<Element>) {
        let snapshot = Snapshot::new("Notes", 42, elements);
        assert_eq!(snapshot.focused_element.as_deref(), Some("e2"));
    }

    #[rstest]
    fn fingerprint_tracks_values(elements: Vec<Element>) {
        let before = Snapshot::new("Notes", 42, elements.clone());
        let mut edited = elements;
        if let Some(element) = edited.get_mut(1) {
            element.value = Some("hello world".to_owned());
        }
        let after = Snapshot::new("Notes", 42, edited);
        assert!(!before.same_content(&after));
        assert_eq!(after.hash.len(), FINGERPRINT_BYTES * 2);
    }

    #[rstest]
    fn fingerprint_ignores_flags(elements: Vec<Element>) {
        let before = Snapshot::new("Notes", 42, elements.clone());
        let toggled: Vec<Element> = elements
            .into_iter()
            .map(|element| element.with_enabled(false))
            .collect();
        let after = Snapshot::new("Notes", 42, toggled);
        assert!(before.same_content(&after));
    }

    #[rstest]
    fn timestamp_is_rfc3339(elements: Vec<Element>) {
        let snapshot = Snapshot::new("Notes", 1, elements);
        assert!(OffsetDateTime::parse(&snapshot.timestamp, &Rfc3339).is_ok());
    }

    #[rstest]
    fn serialises_camel_case_fields(elements: Vec<Element>) {
        let snapshot = Snapshot::captured_at("2024-01-01T00:00:00Z", "Notes", 7, elements);
        let json = serde_json::to_value(&snapshot).expect("serialise snapshot");
        assert_eq!(json["appName"], "Notes");
        assert_eq!(json["focusedElement"], "e2");
        assert_eq!(json["elements"].as_array().map(Vec::len), Some(3));
    }

    #[rstest]
    fn looks_up_elements_by_id(elements: Vec<Element>) {
        let snapshot = Snapshot::new("Notes", 1, elements);
        assert_eq!(snapshot.element("e3").map(|e| e.role.as_str()), Some("Button"));
        assert!(snapshot.element("missing").is_none());
    }
}
