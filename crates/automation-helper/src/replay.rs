//! Helper backend that replays a recorded snapshot.
//!
//! Used for offline testing of clients and of the helper bridge: it needs no
//! accessibility access and answers every request deterministically.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use automation_core::{
    Action, AutomationResponse, CapabilityProfile, Snapshot, StreamToken, current_timestamp,
};
use camino::Utf8Path;
use thiserror::Error;

use crate::service::HelperProvider;

/// Errors raised while loading a recorded snapshot.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot '{path}': {source}")]
    Read {
        /// Snapshot file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not a valid snapshot.
    #[error("failed to decode snapshot '{path}': {source}")]
    Decode {
        /// Snapshot file.
        path: String,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Serves a fixed snapshot and acknowledges every action.
#[derive(Debug)]
pub struct ReplayProvider {
    app_name: String,
    snapshot: Snapshot,
    perform_delay: Duration,
    streams: Mutex<BTreeSet<StreamToken>>,
}

impl ReplayProvider {
    /// Replays an empty tree for `app_name`.
    #[must_use]
    pub fn empty(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        let snapshot = Snapshot::new(app_name.clone(), 0, Vec::new());
        Self::new(app_name, snapshot)
    }

    /// Replays `snapshot` for `app_name`.
    #[must_use]
    pub fn new(app_name: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            app_name: app_name.into(),
            snapshot,
            perform_delay: Duration::ZERO,
            streams: Mutex::new(BTreeSet::new()),
        }
    }

    /// Loads the replayed snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] when the file cannot be read or decoded.
    pub fn from_file(app_name: impl Into<String>, path: &Utf8Path) -> Result<Self, ReplayError> {
        let bytes = fs::read(path).map_err(|source| ReplayError::Read {
            path: path.to_string(),
            source,
        })?;
        let snapshot = serde_json::from_slice(&bytes).map_err(|source| ReplayError::Decode {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::new(app_name, snapshot))
    }

    /// Delays every `perform` reply, simulating a slow application.
    #[must_use]
    pub const fn with_perform_delay(mut self, delay: Duration) -> Self {
        self.perform_delay = delay;
        self
    }
}

impl HelperProvider for ReplayProvider {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn capabilities(&self) -> CapabilityProfile {
        CapabilityProfile {
            app_name: self.app_name.clone(),
            pid: self.snapshot.pid,
            ax_score: 0.5,
            supports_scripting_bridge: true,
            supports_apple_script: true,
            supports_url_schemes: true,
            last_updated: current_timestamp(),
        }
    }

    fn observe(&self) -> Snapshot {
        self.snapshot.clone()
    }

    fn perform(&self, action: &Action) -> AutomationResponse {
        if !self.perform_delay.is_zero() {
            thread::sleep(self.perform_delay);
        }
        AutomationResponse::success(format!("Replayed {}", action.action.as_str()))
    }

    fn start_stream(&self, _interval_ms: u64, token: &StreamToken) -> bool {
        self.streams
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(token.clone());
        true
    }

    fn stop_stream(&self, token: &StreamToken) -> bool {
        self.streams
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(token)
    }
}

#[cfg(test)]
mod tests {
    use automation_core::{ActionKind, Element};
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn loads_snapshot_from_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("snapshot.json")).expect("utf8");
        let snapshot = Snapshot::captured_at(
            "2024-05-01T10:00:00Z",
            "Safari",
            99,
            vec![Element::new("1", "AXWindow", "AXApplication").with_title("Start Page")],
        );
        fs::write(&path, serde_json::to_vec(&snapshot).expect("encode")).expect("write");

        let provider = ReplayProvider::from_file("Safari", &path).expect("load");
        assert_eq!(provider.observe(), snapshot);
        assert_eq!(provider.capabilities().pid, 99);
    }

    #[rstest]
    fn rejects_malformed_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("bad.json")).expect("utf8");
        fs::write(&path, b"[]").expect("write");

        assert!(matches!(
            ReplayProvider::from_file("Safari", &path),
            Err(ReplayError::Decode { .. })
        ));
    }

    #[rstest]
    fn stop_reports_whether_stream_existed() {
        let provider = ReplayProvider::empty("Messages");
        let token = StreamToken::new("tok");
        assert!(!provider.stop_stream(&token));
        assert!(provider.start_stream(250, &token));
        assert!(provider.stop_stream(&token));
    }

    #[rstest]
    fn perform_acknowledges_action() {
        let provider = ReplayProvider::empty("Safari");
        let response = provider.perform(&Action::new(ActionKind::Shortcut));
        assert!(response.success);
        assert_eq!(response.message, "Replayed shortcut");
    }
}
