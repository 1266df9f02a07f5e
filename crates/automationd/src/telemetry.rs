//! Structured logging for the daemon.
//!
//! Events go to stderr, either as flattened JSON objects or as compact text
//! lines. Stream tick threads are named after their token, so thread names
//! are always recorded.

use std::io::{self, IsTerminal};

use automation_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that a subscriber is installed, with the format it writes.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter directives do not parse.
    #[error("invalid log filter '{directives}': {message}")]
    Filter {
        /// Directives as configured.
        directives: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another subscriber was installed outside this module.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Logging settings resolved from the configuration.
struct TelemetrySettings<'a> {
    directives: &'a str,
    format: LogFormat,
    ansi: bool,
}

impl<'a> TelemetrySettings<'a> {
    fn from_config(config: &'a Config) -> Self {
        let format = config.log_format();
        Self {
            directives: config.log_filter(),
            format,
            ansi: !format.is_structured() && io::stderr().is_terminal(),
        }
    }

    fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(self.directives).map_err(|error| TelemetryError::Filter {
            directives: self.directives.to_owned(),
            message: error.to_string(),
        })
    }

    fn subscriber(&self) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(self.filter()?)
            .with_writer(io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .with_ansi(self.ansi)
            .with_timer(fmt::time::UtcTime::rfc_3339());
        Ok(match self.format {
            LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
            LogFormat::Compact => Box::new(builder.compact().finish()),
        })
    }
}

/// Installs the global subscriber described by `config`.
///
/// The filter is validated on every call. Only the first call installs a
/// subscriber; later calls report the format that is already active.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when `log_filter` does not parse and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already the
/// global default.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let settings = TelemetrySettings::from_config(config);
    settings.filter()?;
    let format = INSTALLED.get_or_try_init(|| {
        let subscriber = settings.subscriber()?;
        tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
        Ok::<_, TelemetryError>(settings.format)
    })?;
    Ok(TelemetryHandle { format: *format })
}
