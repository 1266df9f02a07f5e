//! Structural comparison between two snapshots of the same application.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::Element;
use crate::snapshot::Snapshot;

/// Summary reported when two snapshots are equivalent.
pub const NO_CHANGES_SUMMARY: &str = "No changes detected.";

/// A single field change on an element present in both snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementChange {
    /// Identifier of the changed element.
    pub id: String,
    /// Name of the changed field: `title`, `value`, `enabled` or `focused`.
    pub field: String,
    /// Previous value.
    pub before: Option<String>,
    /// Current value.
    pub after: Option<String>,
}

/// Result of comparing a previous snapshot with the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Whether anything was added, removed or modified.
    pub changed: bool,
    /// Elements present only in the current snapshot.
    pub added: Vec<Element>,
    /// Elements present only in the previous snapshot.
    pub removed: Vec<Element>,
    /// One entry per changed field of elements present in both snapshots.
    pub modified: Vec<ElementChange>,
    /// Reserved for higher-level change signals.
    #[serde(default)]
    pub signals: Vec<String>,
    /// Human-readable description of the counts.
    pub summary: String,
}

/// Errors raised when two snapshots cannot be compared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// The snapshots describe different applications.
    #[error("cannot diff snapshots of '{previous}' against '{current}'")]
    AppMismatch {
        /// Application of the previous snapshot.
        previous: String,
        /// Application of the current snapshot.
        current: String,
    },
}

impl Diff {
    /// Compares `previous` with `current`.
    ///
    /// Elements are treated as sets under full-field equality, so an edited
    /// element appears in `added` and `removed` as well as in `modified`.
    /// Result order follows snapshot order.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::AppMismatch`] when the snapshots belong to
    /// different applications.
    pub fn between(previous: &Snapshot, current: &Snapshot) -> Result<Self, DiffError> {
        if previous.app_name != current.app_name {
            return Err(DiffError::AppMismatch {
                previous: previous.app_name.clone(),
                current: current.app_name.clone(),
            });
        }
        Ok(Self::of_elements(&previous.elements, &current.elements))
    }

    fn of_elements(previous: &[Element], current: &[Element]) -> Self {
        let previous_set: HashSet<&Element> = previous.iter().collect();
        let current_set: HashSet<&Element> = current.iter().collect();

        let added = distinct_missing_from(current, &previous_set);
        let removed = distinct_missing_from(previous, &current_set);

        let previous_by_id: HashMap<&str, &Element> = previous
            .iter()
            .map(|element| (element.id.as_str(), element))
            .collect();
        let mut modified = Vec::new();
        let mut seen = HashSet::new();
        for element in current {
            if !seen.insert(element.id.as_str()) {
                continue;
            }
            if let Some(before) = previous_by_id.get(element.id.as_str()) {
                field_changes(before, element, &mut modified);
            }
        }

        let changed = !added.is_empty() || !removed.is_empty() || !modified.is_empty();
        let summary = summarise(added.len(), removed.len(), modified.len());
        Self {
            changed,
            added,
            removed,
            modified,
            signals: Vec::new(),
            summary,
        }
    }
}

fn distinct_missing_from(elements: &[Element], other: &HashSet<&Element>) -> Vec<Element> {
    let mut emitted = HashSet::new();
    elements
        .iter()
        .filter(|element| !other.contains(element) && emitted.insert(*element))
        .cloned()
        .collect()
}

fn field_changes(before: &Element, after: &Element, out: &mut Vec<ElementChange>) {
    let id = &after.id;
    let mut push = |field: &str, old: Option<String>, new: Option<String>| {
        out.push(ElementChange {
            id: id.clone(),
            field: field.to_owned(),
            before: old,
            after: new,
        });
    };
    if before.title != after.title {
        push("title", before.title.clone(), after.title.clone());
    }
    if before.value != after.value {
        push("value", before.value.clone(), after.value.clone());
    }
    if before.enabled != after.enabled {
        push(
            "enabled",
            Some(before.enabled.to_string()),
            Some(after.enabled.to_string()),
        );
    }
    if before.focused != after.focused {
        push(
            "focused",
            Some(before.focused.to_string()),
            Some(after.focused.to_string()),
        );
    }
}

fn summarise(added: usize, removed: usize, modified: usize) -> String {
    let parts: Vec<String> = [(added, "added"), (removed, "removed"), (modified, "modified")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();
    if parts.is_empty() {
        NO_CHANGES_SUMMARY.to_owned()
    } else {
        format!("UI changed: {}.", parts.join(", "))
    }
}
