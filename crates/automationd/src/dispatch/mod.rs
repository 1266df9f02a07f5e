//! JSON-RPC request dispatch for client connections.
//!
//! Clients exchange `Content-Length` framed JSON-RPC 2.0 messages with the
//! daemon over the Unix socket:
//!
//! ```json
//! {"jsonrpc":"2.0","id":1,"method":"observe","params":{"app":"Notes"}}
//! ```
//!
//! Every request receives exactly one response whose `result` is an
//! automation response:
//!
//! ```json
//! {"jsonrpc":"2.0","id":1,"result":{"success":true,"message":"Observed","signals":[],"data":{}}}
//! ```
//!
//! Stream subscriptions add unsolicited event frames
//! (`{"token":..,"event":"snapshot","data":..}`) on the same connection.
//! A body that is not a request envelope is answered with id `"unknown"`
//! and the connection stays open; a framing error closes it.

mod baselines;
mod errors;
mod handler;
mod params;
mod router;
mod session;

pub use self::baselines::Baselines;
pub use self::errors::DispatchError;
pub use self::handler::DispatchConnectionHandler;
pub use self::router::{Method, Router};
pub use self::session::Session;
