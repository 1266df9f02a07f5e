//! Helper process termination.

use std::process::Child;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::app::HelperApp;
use crate::bridge::BRIDGE_TARGET;

/// Time a helper gets to exit on its own once its input is closed.
const GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Waits briefly for `child` to exit, then kills it.
///
/// Callers close the helper's stdin first, which well-behaved helpers treat
/// as a request to exit.
pub(crate) fn terminate_child(child: &mut Child, app: HelperApp) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(
                target: BRIDGE_TARGET,
                app = %app,
                ?status,
                "helper exited"
            );
        }
        Ok(None) => {
            debug!(
                target: BRIDGE_TARGET,
                app = %app,
                pid = child.id(),
                "helper still running, waiting before killing"
            );
            thread::sleep(GRACE_PERIOD);
            reap_or_kill(child, app);
        }
        Err(error) => {
            warn!(
                target: BRIDGE_TARGET,
                app = %app,
                error = %error,
                "failed to check helper status, waiting before killing"
            );
            thread::sleep(GRACE_PERIOD);
            reap_or_kill(child, app);
        }
    }
}

fn reap_or_kill(child: &mut Child, app: HelperApp) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(
                target: BRIDGE_TARGET,
                app = %app,
                ?status,
                "helper exited during grace period"
            );
        }
        Ok(None) | Err(_) => {
            if let Err(error) = child.kill() {
                warn!(
                    target: BRIDGE_TARGET,
                    app = %app,
                    error = %error,
                    "failed to kill helper"
                );
            }
            if let Err(error) = child.wait() {
                warn!(
                    target: BRIDGE_TARGET,
                    app = %app,
                    error = %error,
                    "failed to reap helper"
                );
            }
        }
    }
}
