//! Out-of-process helpers for application-specific automation.
//!
//! Some actions (URL navigation, menu invocation, shortcut dispatch,
//! scripted text entry) need a backend running beside the target
//! application. Each such backend is a helper process speaking the daemon's
//! `Content-Length` JSON-RPC framing over stdin/stdout.
//!
//! - [`HelperBridge`] spawns helpers on first use, keeps one connection per
//!   application and respawns a helper that has died by the next request.
//! - [`HelperChannel`] is the callback-completing operation set of a
//!   connection; [`observe_within`], [`perform_within`] and friends wait for
//!   a reply with a deadline.
//! - [`HelperService`] is the helper-side request loop around a
//!   [`HelperProvider`]; the `automation-helper-replay` binary runs it with a
//!   [`ReplayProvider`].

mod app;
mod blocking;
mod bridge;
mod channel;
mod command;
mod connection;
mod error;
pub mod jsonrpc;
mod lifecycle;
mod replay;
mod service;

pub use app::HelperApp;
pub use blocking::{
    DEFAULT_HELPER_TIMEOUT, HELPER_TIMEOUT_MESSAGE, capabilities_within, observe_within,
    perform_within, start_stream_within, stop_stream_within, wait_for,
};
pub use bridge::{HelperBridge, HelperDirectory};
pub use channel::{HelperChannel, Reply};
pub use command::HelperCommand;
pub use connection::HelperConnection;
pub use error::HelperError;
pub use replay::{ReplayError, ReplayProvider};
pub use service::{HelperProvider, HelperService, INVALID_ACTION_MESSAGE};
