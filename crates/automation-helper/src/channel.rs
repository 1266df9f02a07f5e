//! Callback-completing operations offered by a helper connection.

use automation_core::{Action, AutomationResponse, CapabilityProfile, Snapshot, StreamToken};

/// Completion callback for a helper operation.
///
/// Every callback is invoked exactly once: with the decoded reply, or with
/// the operation's failure value when the helper cannot answer.
pub type Reply<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Operations a helper exposes to the daemon.
///
/// Calls return immediately; results arrive through the supplied [`Reply`],
/// possibly on another thread. Use the `*_within` functions in this crate to
/// wait for a result with a deadline.
pub trait HelperChannel: Send + Sync {
    /// Requests the helper's capability profile; `None` when unavailable.
    fn capabilities(&self, reply: Reply<Option<CapabilityProfile>>);

    /// Requests a fresh snapshot; `None` when unavailable.
    fn observe(&self, reply: Reply<Option<Snapshot>>);

    /// Asks the helper to perform `action`; `None` when no reply arrived.
    fn perform(&self, action: &Action, reply: Reply<Option<AutomationResponse>>);

    /// Starts helper-side streaming; `false` when refused or unavailable.
    fn start_stream(&self, interval_ms: u64, token: &StreamToken, reply: Reply<bool>);

    /// Stops helper-side streaming; `false` when refused or unavailable.
    fn stop_stream(&self, token: &StreamToken, reply: Reply<bool>);

    /// Whether the connection can still carry requests.
    fn is_open(&self) -> bool;
}
