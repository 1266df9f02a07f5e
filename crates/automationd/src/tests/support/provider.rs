//! Scripted accessibility backend for router and dispatch scenarios.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use automation_core::{AutomationResponse, KeyModifier, Snapshot};

use crate::driver::{AppTarget, ObservationProvider};

/// Reports a single application as running and replays snapshots in order.
///
/// The last snapshot is repeated once the script runs out. Every trait call
/// is counted so tests can assert that a request never reached the backend.
#[derive(Debug)]
pub struct ScriptedProvider {
    app: String,
    snapshots: Mutex<VecDeque<Snapshot>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(app: &str, snapshots: Vec<Snapshot>) -> Self {
        Self {
            app: app.to_owned(),
            snapshots: Mutex::new(snapshots.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of backend calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl ObservationProvider for ScriptedProvider {
    fn connect(&self, app_name: &str) -> Option<AppTarget> {
        self.record();
        (app_name == self.app).then(|| AppTarget::new(app_name, 501))
    }

    fn observe(&self, target: &AppTarget) -> Snapshot {
        self.record();
        let mut snapshots = self.snapshots.lock().expect("snapshot script lock");
        if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        }
        .unwrap_or_else(|| Snapshot::new(target.name.clone(), target.pid, Vec::new()))
    }

    fn click(&self, _target: &AppTarget, element_id: &str) -> AutomationResponse {
        self.record();
        AutomationResponse::success(format!("Clicked {element_id}"))
    }

    fn set_value(&self, _target: &AppTarget, element_id: &str, _text: &str) -> AutomationResponse {
        self.record();
        AutomationResponse::success(format!("Set value of {element_id}"))
    }

    fn press_key(
        &self,
        _target: &AppTarget,
        key_code: u16,
        _modifiers: &[KeyModifier],
    ) -> AutomationResponse {
        self.record();
        AutomationResponse::success(format!("Pressed {key_code}"))
    }

    fn scroll(
        &self,
        _target: &AppTarget,
        _element_id: Option<&str>,
        _delta_x: i32,
        _delta_y: i32,
    ) -> AutomationResponse {
        self.record();
        AutomationResponse::success("Scrolled")
    }
}
