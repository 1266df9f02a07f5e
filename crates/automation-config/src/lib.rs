//! Shared configuration for the automation daemon and its helpers.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path`), then `APP_AUTOMATION_*` environment
//! variables, then command-line flags. The daemon reads its configuration
//! once at startup; there is no hot reload.
//!
//! `dry_run` is the exception to flag precedence. The file and environment
//! layers decide it, and the bare `--dry-run` switch can only turn it on, so
//! an unrelated flag never switches the gate off.

mod defaults;
mod flag;
mod logging;
mod socket;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HELPER_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_SOCKET_PATH, default_helper_timeout_ms,
    default_log_filter, default_log_filter_string, default_log_format, default_socket_path,
};
pub use flag::parse_flag;
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketPreparationError, prepare_socket_directory};

/// Runtime configuration for the automation daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "APP_AUTOMATION")]
pub struct Config {
    /// Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket: Utf8PathBuf,
    /// Blocks every action-performing request when set.
    #[serde(default, deserialize_with = "flag::deserialize")]
    #[ortho_config(skip_cli)]
    pub dry_run: bool,
    /// Executable serving Safari automation requests.
    #[serde(default)]
    pub safari_helper: Option<Utf8PathBuf>,
    /// Executable serving Messages automation requests.
    #[serde(default)]
    pub messages_helper: Option<Utf8PathBuf>,
    /// Milliseconds a blocking helper call waits for its reply.
    #[serde(default = "default_helper_timeout_ms")]
    pub helper_timeout_ms: u64,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket_path(),
            dry_run: false,
            safari_helper: None,
            messages_helper: None,
            helper_timeout_ms: default_helper_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Command-line switch forcing dry-run on.
pub const DRY_RUN_SWITCH: &str = "--dry-run";

impl Config {
    /// Loads the layered configuration from `args`.
    ///
    /// Occurrences of [`DRY_RUN_SWITCH`] are removed before the remaining
    /// arguments are parsed and enable dry-run afterwards. Without the switch
    /// the configuration file and `APP_AUTOMATION_DRY_RUN` decide.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` error when the arguments, the file or the
    /// environment do not form a valid configuration.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let (switches, remaining): (Vec<OsString>, Vec<OsString>) = args
            .into_iter()
            .map(Into::into)
            .partition(|arg| arg == DRY_RUN_SWITCH);
        let mut config = <Self as OrthoConfig>::load_from_iter(remaining)?;
        config.dry_run |= !switches.is_empty();
        Ok(config)
    }

    /// Socket path the daemon binds.
    #[must_use]
    pub fn socket(&self) -> &Utf8Path {
        &self.socket
    }

    /// Whether action-performing requests are blocked.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Configured Safari helper executable.
    #[must_use]
    pub fn safari_helper(&self) -> Option<&Utf8Path> {
        self.safari_helper.as_deref()
    }

    /// Configured Messages helper executable.
    #[must_use]
    pub fn messages_helper(&self) -> Option<&Utf8Path> {
        self.messages_helper.as_deref()
    }

    /// Deadline applied to blocking helper calls.
    #[must_use]
    pub const fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }

    /// Logging filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Logging output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
