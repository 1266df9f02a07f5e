//! Spawning and supervision of per-application helper processes.

use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use automation_config::Config;
use tracing::{debug, info, warn};

use crate::app::HelperApp;
use crate::channel::HelperChannel;
use crate::command::HelperCommand;
use crate::connection::HelperConnection;
use crate::error::HelperError;
use crate::lifecycle::terminate_child;

/// Log target for helper supervision.
pub(crate) const BRIDGE_TARGET: &str = "automation_helper::bridge";

/// Source of helper connections, keyed by application.
pub trait HelperDirectory: Send + Sync {
    /// Returns a live connection to the helper for `app`, starting the
    /// helper when needed; `None` when no helper can be reached.
    fn connection(&self, app: HelperApp) -> Option<Arc<dyn HelperChannel>>;

    /// Invalidates every connection and terminates every helper.
    fn stop_helpers(&self);
}

struct HelperSlot {
    child: Child,
    connection: Arc<HelperConnection>,
}

/// Lazily spawns one helper per application and keeps its connection.
///
/// A helper whose process has exited, or whose connection has closed, is
/// reaped and replaced on the next [`HelperDirectory::connection`] call.
/// Nothing restarts helpers in the background.
pub struct HelperBridge {
    commands: HashMap<HelperApp, HelperCommand>,
    slots: Mutex<HashMap<HelperApp, HelperSlot>>,
}

impl HelperBridge {
    /// Creates a bridge with no helpers configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a bridge using the helper executables named in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut bridge = Self::new();
        if let Some(path) = config.safari_helper() {
            bridge = bridge.with_command(HelperApp::Safari, HelperCommand::new(path.as_std_path()));
        }
        if let Some(path) = config.messages_helper() {
            bridge =
                bridge.with_command(HelperApp::Messages, HelperCommand::new(path.as_std_path()));
        }
        bridge
    }

    /// Configures how to start the helper for `app`.
    #[must_use]
    pub fn with_command(mut self, app: HelperApp, command: HelperCommand) -> Self {
        self.commands.insert(app, command);
        self
    }

    /// Whether a helper executable is configured for `app`.
    #[must_use]
    pub fn is_configured(&self, app: HelperApp) -> bool {
        self.commands.contains_key(&app)
    }

    /// Process id of the running helper for `app`, if any.
    #[must_use]
    pub fn helper_pid(&self, app: HelperApp) -> Option<u32> {
        self.lock_slots().get(&app).map(|slot| slot.child.id())
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<HelperApp, HelperSlot>> {
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn spawn(&self, app: HelperApp) -> Result<HelperSlot, HelperError> {
        let command = self
            .commands
            .get(&app)
            .ok_or(HelperError::NotConfigured { app })?;

        debug!(
            target: BRIDGE_TARGET,
            app = %app,
            program = %command.program.display(),
            args = ?command.args,
            "spawning helper process"
        );

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &command.working_dir {
            process.current_dir(dir);
        }

        let mut child = process.spawn().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                HelperError::BinaryNotFound {
                    command: command.program.display().to_string(),
                    source: Arc::new(error),
                }
            } else {
                HelperError::SpawnFailed {
                    message: format!("failed to start {}", command.program.display()),
                    source: Arc::new(error),
                }
            }
        })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            terminate_child(&mut child, app);
            return Err(HelperError::SpawnFailed {
                message: "failed to capture helper stdio".to_owned(),
                source: Arc::new(std::io::Error::other("missing pipe")),
            });
        };

        let connection = match HelperConnection::start(app, stdout, stdin) {
            Ok(connection) => connection,
            Err(error) => {
                terminate_child(&mut child, app);
                return Err(error);
            }
        };

        info!(
            target: BRIDGE_TARGET,
            app = %app,
            pid = child.id(),
            "helper process spawned"
        );

        Ok(HelperSlot {
            child,
            connection: Arc::new(connection),
        })
    }

    /// Stores a freshly spawned helper unless a concurrent caller already
    /// installed one, in which case the newer process is discarded.
    fn install(&self, app: HelperApp, slot: HelperSlot) -> Arc<dyn HelperChannel> {
        let mut slots = self.lock_slots();
        if let Some(existing) = slots.get(&app) {
            let connection: Arc<dyn HelperChannel> = existing.connection.clone();
            drop(slots);
            let HelperSlot {
                mut child,
                connection: duplicate,
            } = slot;
            duplicate.invalidate();
            drop(duplicate);
            terminate_child(&mut child, app);
            return connection;
        }
        let connection: Arc<dyn HelperChannel> = slot.connection.clone();
        slots.insert(app, slot);
        connection
    }
}

impl Default for HelperBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperDirectory for HelperBridge {
    fn connection(&self, app: HelperApp) -> Option<Arc<dyn HelperChannel>> {
        let stale = {
            let mut slots = self.lock_slots();
            match slots.remove(&app) {
                Some(mut slot) => {
                    let running = matches!(slot.child.try_wait(), Ok(None));
                    if running && slot.connection.is_open() {
                        let connection: Arc<dyn HelperChannel> = slot.connection.clone();
                        slots.insert(app, slot);
                        return Some(connection);
                    }
                    Some(slot)
                }
                None => None,
            }
        };

        // Reaping and spawning happen unlocked; lookups for other apps
        // must not wait on them.
        if let Some(mut slot) = stale {
            warn!(
                target: BRIDGE_TARGET,
                app = %app,
                pid = slot.child.id(),
                "helper is gone, respawning"
            );
            slot.connection.invalidate();
            terminate_child(&mut slot.child, app);
        }

        match self.spawn(app) {
            Ok(slot) => Some(self.install(app, slot)),
            Err(HelperError::NotConfigured { .. }) => {
                debug!(target: BRIDGE_TARGET, app = %app, "no helper configured");
                None
            }
            Err(error) => {
                warn!(
                    target: BRIDGE_TARGET,
                    app = %app,
                    error = %error,
                    "helper unavailable"
                );
                None
            }
        }
    }

    fn stop_helpers(&self) {
        let drained: Vec<(HelperApp, HelperSlot)> = self.lock_slots().drain().collect();
        for (app, mut slot) in drained {
            info!(
                target: BRIDGE_TARGET,
                app = %app,
                pid = slot.child.id(),
                "stopping helper"
            );
            slot.connection.invalidate();
            // Dropping the last connection handle closes the helper's stdin.
            drop(slot.connection);
            terminate_child(&mut slot.child, app);
        }
    }
}

impl Drop for HelperBridge {
    fn drop(&mut self) {
        self.stop_helpers();
    }
}

impl std::fmt::Debug for HelperBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running: Vec<HelperApp> = self.lock_slots().keys().copied().collect();
        f.debug_struct("HelperBridge")
            .field("configured", &self.commands.keys().collect::<Vec<_>>())
            .field("running", &running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn unconfigured_app_has_no_connection() {
        let bridge = HelperBridge::new();
        assert!(bridge.connection(HelperApp::Safari).is_none());
        assert_eq!(bridge.helper_pid(HelperApp::Safari), None);
    }

    #[rstest]
    fn missing_binary_has_no_connection() {
        let bridge = HelperBridge::new().with_command(
            HelperApp::Messages,
            HelperCommand::new("/nonexistent/automation-helper"),
        );
        assert!(bridge.is_configured(HelperApp::Messages));
        assert!(bridge.connection(HelperApp::Messages).is_none());
    }

    #[rstest]
    fn config_paths_become_commands() {
        let config = Config {
            safari_helper: Some("/opt/helpers/safari".into()),
            ..Config::default()
        };
        let bridge = HelperBridge::from_config(&config);
        assert!(bridge.is_configured(HelperApp::Safari));
        assert!(!bridge.is_configured(HelperApp::Messages));
    }
}
