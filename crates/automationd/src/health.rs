//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use automation_config::Config;
use camino::Utf8Path;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the socket listener accepts connections.
    fn listener_ready(&self, socket: &Utf8Path);

    /// Invoked when the socket cannot be bound.
    fn listener_failed(&self, socket: &Utf8Path, error: &ListenerError);

    /// Invoked when shutdown begins.
    fn shutdown_starting(&self);

    /// Invoked after the listener, streams and helpers have stopped.
    fn shutdown_completed(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        (**self).listener_ready(socket);
    }

    fn listener_failed(&self, socket: &Utf8Path, error: &ListenerError) {
        (**self).listener_failed(socket, error);
    }

    fn shutdown_starting(&self) {
        (**self).shutdown_starting();
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "automationd::health",
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "automationd::health",
            event = "bootstrap_succeeded",
            socket = %config.socket(),
            dry_run = config.dry_run(),
            helper_timeout_ms = config.helper_timeout_ms,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "automationd::health",
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, socket: &Utf8Path) {
        tracing::info!(
            target: "automationd::health",
            event = "listener_ready",
            socket = %socket,
            "accepting client connections"
        );
    }

    fn listener_failed(&self, socket: &Utf8Path, error: &ListenerError) {
        tracing::error!(
            target: "automationd::health",
            event = "listener_failed",
            socket = %socket,
            error = %error,
            "daemon socket could not be bound"
        );
    }

    fn shutdown_starting(&self) {
        tracing::info!(
            target: "automationd::health",
            event = "shutdown_starting",
            "stopping daemon"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: "automationd::health",
            event = "shutdown_completed",
            "daemon stopped"
        );
    }
}
