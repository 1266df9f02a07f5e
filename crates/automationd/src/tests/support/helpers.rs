//! In-memory helper connections that answer immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use automation_core::{
    Action, AutomationResponse, CapabilityProfile, Snapshot, StreamToken,
};
use automation_helper::{HelperApp, HelperChannel, HelperDirectory, Reply};

/// Helper that serves a fixed snapshot, records delegated actions and
/// stream control, and has no capability profile.
#[derive(Debug)]
pub struct ScriptedHelper {
    snapshot: Snapshot,
    actions: Mutex<Vec<Action>>,
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl ScriptedHelper {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            actions: Mutex::default(),
            started: Mutex::default(),
            stopped: Mutex::default(),
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().expect("actions lock").clone()
    }

    pub fn started_streams(&self) -> Vec<String> {
        self.started.lock().expect("started lock").clone()
    }

    pub fn stopped_streams(&self) -> Vec<String> {
        self.stopped.lock().expect("stopped lock").clone()
    }
}

impl HelperChannel for ScriptedHelper {
    fn capabilities(&self, reply: Reply<Option<CapabilityProfile>>) {
        reply(None);
    }

    fn observe(&self, reply: Reply<Option<Snapshot>>) {
        reply(Some(self.snapshot.clone()));
    }

    fn perform(&self, action: &Action, reply: Reply<Option<AutomationResponse>>) {
        self.actions.lock().expect("actions lock").push(action.clone());
        reply(Some(AutomationResponse::success(format!(
            "Helper performed {}",
            action.action.as_str()
        ))));
    }

    fn start_stream(&self, _interval_ms: u64, token: &StreamToken, reply: Reply<bool>) {
        self.started
            .lock()
            .expect("started lock")
            .push(token.as_str().to_owned());
        reply(true);
    }

    fn stop_stream(&self, token: &StreamToken, reply: Reply<bool>) {
        self.stopped
            .lock()
            .expect("stopped lock")
            .push(token.as_str().to_owned());
        reply(true);
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// Directory that hands out the same channel for every helper app.
#[derive(Default)]
pub struct FixedDirectory {
    channel: Option<Arc<dyn HelperChannel>>,
    stopped: AtomicBool,
}

impl FixedDirectory {
    pub fn with_channel(channel: Arc<dyn HelperChannel>) -> Self {
        Self {
            channel: Some(channel),
            stopped: AtomicBool::new(false),
        }
    }

    /// A directory for which no helper can be started.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl HelperDirectory for FixedDirectory {
    fn connection(&self, _app: HelperApp) -> Option<Arc<dyn HelperChannel>> {
        self.channel.clone()
    }

    fn stop_helpers(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
