//! Daemon bootstrap orchestration.

use std::sync::Arc;

use automation_config::{Config, SocketPreparationError, prepare_socket_directory};
use automation_helper::{HelperBridge, HelperDirectory};
use ortho_config::OrthoError;
use thiserror::Error;

use crate::dispatch::{DispatchConnectionHandler, Router};
use crate::driver::{ObservationProvider, UnavailableProvider};
use crate::health::HealthReporter;
use crate::streams::StreamCoordinator;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads the process arguments, the environment and any
/// configuration file through [`Config::load_from_args`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_args(std::env::args_os())
    }
}

/// Loader returning a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already loaded configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Automation backends the daemon routes requests to.
pub struct Backends {
    /// In-process accessibility backend.
    pub provider: Arc<dyn ObservationProvider>,
    /// Source of helper connections.
    pub helpers: Arc<dyn HelperDirectory>,
}

impl Backends {
    /// Bundles a provider and a helper directory.
    #[must_use]
    pub fn new(
        provider: Arc<dyn ObservationProvider>,
        helpers: Arc<dyn HelperDirectory>,
    ) -> Self {
        Self { provider, helpers }
    }

    /// Production backends: no in-process accessibility support and the
    /// helper executables named in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(UnavailableProvider),
            Arc::new(HelperBridge::from_config(config)),
        )
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    handler: Arc<DispatchConnectionHandler>,
    streams: StreamCoordinator,
    helpers: Arc<dyn HelperDirectory>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Handler serving client connections.
    #[must_use]
    pub fn connection_handler(&self) -> Arc<DispatchConnectionHandler> {
        Arc::clone(&self.handler)
    }

    /// Binds the configured socket.
    ///
    /// # Errors
    ///
    /// Returns the listener's error when the socket path is occupied or
    /// cannot be bound. The failure is also reported through the health
    /// reporter.
    pub fn bind(&self) -> Result<SocketListener, ListenerError> {
        SocketListener::bind(self.config.socket()).inspect_err(|error| {
            self.reporter.listener_failed(self.config.socket(), error);
        })
    }

    /// Starts accepting clients on `listener`.
    ///
    /// # Errors
    ///
    /// Returns the listener's error when the accept loop cannot start.
    pub fn serve(&self, listener: SocketListener) -> Result<ListenerHandle, ListenerError> {
        let socket = listener.path().to_path_buf();
        let handle = listener.start(self.connection_handler())?;
        self.reporter.listener_ready(&socket);
        Ok(handle)
    }

    /// Stops the listener, every stream subscription and every helper.
    ///
    /// Streams and helpers are stopped even when the listener thread
    /// panicked.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread
    /// panicked.
    pub fn shutdown(self, listener: ListenerHandle) -> Result<(), ListenerError> {
        self.reporter.shutdown_starting();
        listener.shutdown();
        let joined = listener.join();
        self.streams.stop_all();
        self.helpers.stop_helpers();
        self.reporter.shutdown_completed();
        joined
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Fails when the configuration cannot be loaded, telemetry cannot be
/// installed or the socket directory cannot be prepared. Every failure is
/// also reported through `reporter`. `backends` is only invoked once the
/// configuration is known.
pub fn bootstrap_with<B>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    backends: B,
) -> Result<Daemon, BootstrapError>
where
    B: FnOnce(&Config) -> Backends,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = prepare_socket_directory(config.socket()) {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let Backends { provider, helpers } = backends(&config);
    let streams = StreamCoordinator::new();
    let router = Router::new(provider, Arc::clone(&helpers), streams.clone())
        .with_dry_run(config.dry_run())
        .with_helper_timeout(config.helper_timeout());
    let handler = Arc::new(DispatchConnectionHandler::new(router, streams.clone()));
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        telemetry,
        reporter,
        handler,
        streams,
        helpers,
    })
}
