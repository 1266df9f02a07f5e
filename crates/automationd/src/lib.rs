//! Automation daemon serving accessibility observation and actions over a
//! Unix socket.
//!
//! Clients send `Content-Length` framed JSON-RPC requests. The daemon
//! resolves each against one of three backends:
//!
//! - the in-process [`driver`], which observes and acts on applications
//!   through an [`driver::ObservationProvider`];
//! - per-application helper processes managed by
//!   [`automation_helper::HelperBridge`], for URL navigation, menus,
//!   shortcuts and scripted text entry;
//! - the [`streams`] coordinator, which pushes periodic snapshots and diffs
//!   to the client that asked for them.
//!
//! Startup follows a fixed sequence: load configuration, initialise
//! telemetry, prepare and bind the socket, then accept clients until a
//! termination signal arrives. Lifecycle milestones are reported through a
//! [`HealthReporter`]. Dry-run mode blocks every action-performing request
//! before it reaches a backend.
//!
//! The daemon serves one client at a time; a new connection displaces the
//! previous one and ends its stream subscriptions.

mod bootstrap;
pub mod dispatch;
pub mod driver;
mod health;
mod process;
pub mod streams;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    Backends, BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
