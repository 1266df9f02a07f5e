//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use automation_config::Config;
use tracing::info;

use crate::bootstrap::{Backends, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S, B> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) backends: B,
}

/// Runs the daemon using the production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, socket binding or signal
/// handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        backends: Backends::from_config,
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
///
/// Bootstrap installs telemetry before the socket is bound, so every
/// startup failure after configuration loading is logged as well as
/// reported through the health reporter.
pub(crate) fn run_daemon_with<L, S, B>(plan: LaunchPlan<L, S, B>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
    B: FnOnce(&Config) -> Backends,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        backends: build_backends,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter, build_backends)?;
    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let listener = daemon.bind()?;
    let listener_handle = daemon.serve(listener)?;

    shutdown.wait()?;
    daemon.shutdown(listener_handle)?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
