//! Last observed snapshot per application.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use automation_core::Snapshot;

/// Snapshots recorded by `observe`, `diff` and stream ticks, keyed by the
/// application name the client asked for.
#[derive(Debug, Default)]
pub struct Baselines {
    snapshots: Mutex<HashMap<String, Snapshot>>,
}

impl Baselines {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `snapshot` for `app` and returns the one it replaced.
    pub fn replace(&self, app: &str, snapshot: Snapshot) -> Option<Snapshot> {
        self.lock().insert(app.to_owned(), snapshot)
    }

    /// Current baseline for `app`.
    #[must_use]
    pub fn get(&self, app: &str) -> Option<Snapshot> {
        self.lock().get(app).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Snapshot>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
