//! Shared data model for the app automation daemon.
//!
//! The crate defines the value types exchanged between the daemon, its
//! clients and the per-application helpers: flattened accessibility
//! [`Element`]s gathered into [`Snapshot`]s, declarative [`Selector`]s,
//! [`Action`] requests, structural [`Diff`]s between snapshots, and the
//! JSON-RPC envelopes that carry them over the wire.
//!
//! Everything here is pure data plus two algorithms: [`Diff::between`], which
//! compares two snapshots of the same application, and [`Selector::select`],
//! which filters a snapshot's elements. Neither performs I/O, so both are safe
//! to call from request handlers and stream ticks alike.

mod action;
mod capability;
mod diff;
mod element;
mod envelope;
mod response;
mod selector;
mod snapshot;

pub use action::{Action, ActionKind, KeyModifier};
pub use capability::CapabilityProfile;
pub use diff::{Diff, DiffError, ElementChange, NO_CHANGES_SUMMARY};
pub use element::{Bounds, Element, MAX_VALUE_CHARS, PATH_SEPARATOR, truncate_value};
pub use envelope::{
    JSONRPC_VERSION, RequestEnvelope, RequestId, ResponseEnvelope, StreamEvent, StreamEventKind,
    StreamToken,
};
pub use response::{AutomationResponse, ErrorCode};
pub use selector::{MatchMode, Selector, SelectorBounds, SelectorField};
pub use snapshot::{Snapshot, current_timestamp};
