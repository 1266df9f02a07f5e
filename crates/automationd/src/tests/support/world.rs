//! BDD test world: owns the loader, reporter, backends and daemon state
//! that bootstrap and lifecycle steps operate on.

use std::cell::RefCell;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use automation_config::Config;
use automation_core::{RequestEnvelope, RequestId, ResponseEnvelope, Snapshot};
use automation_framing::{MessageReader, encode_frame};
use automation_helper::{HelperChannel, HelperDirectory};
use camino::Utf8PathBuf;

use crate::bootstrap::{Backends, BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::health::HealthReporter;
use crate::transport::{ListenerError, ListenerHandle};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::helpers::{FixedDirectory, ScriptedHelper};
use super::provider::ScriptedProvider;
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub helpers: Arc<FixedDirectory>,
    daemon: Option<Daemon>,
    listener: Option<ListenerHandle>,
    socket: Option<Utf8PathBuf>,
    bootstrap_error: Option<BootstrapError>,
    shutdown_result: Option<Result<(), ListenerError>>,
    responses: Vec<ResponseEnvelope>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            helpers: Arc::new(FixedDirectory::with_channel(Arc::new(ScriptedHelper::new(
                Snapshot::new("Safari", 1, Vec::new()),
            )) as Arc<dyn HelperChannel>)),
            daemon: None,
            listener: None,
            socket: None,
            bootstrap_error: None,
            shutdown_result: None,
            responses: Vec::new(),
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader::new());
        self.reset_results();
    }

    /// Installs a loader that succeeds with dry-run enabled.
    pub fn use_dry_run_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader::new().with_dry_run());
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let backends = Backends::new(
            Arc::new(ScriptedProvider::new("Notes", Vec::new())),
            Arc::clone(&self.helpers) as Arc<dyn HelperDirectory>,
        );
        match bootstrap_with(
            &*self.loader,
            Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
            move |_: &Config| backends,
        ) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Binds the configured socket and starts serving clients.
    pub fn serve(&mut self) {
        let daemon = self.daemon.as_ref().expect("daemon bootstrapped");
        let listener = daemon.bind().expect("bind socket");
        self.socket = Some(listener.path().to_path_buf());
        self.listener = Some(daemon.serve(listener).expect("start listener"));
    }

    /// Sends one request over a fresh connection and records the response.
    pub fn send(&mut self, request: &RequestEnvelope) {
        let daemon = self.daemon.as_ref().expect("daemon bootstrapped");
        let mut stream = UnixStream::connect(daemon.config().socket()).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set read timeout");
        let body = serde_json::to_vec(request).expect("encode request");
        stream.write_all(&encode_frame(&body)).expect("write request");
        let mut reader = MessageReader::new(stream);
        let frame = reader
            .next_message()
            .expect("read response")
            .expect("response before EOF");
        self.responses
            .push(serde_json::from_slice(&frame).expect("decode response"));
    }

    /// Sends a request with no parameters.
    pub fn send_method(&mut self, method: &str) {
        self.send(&RequestEnvelope::new(RequestId::Number(1), method));
    }

    /// Stops the daemon and its listener.
    pub fn shutdown(&mut self) {
        let daemon = self.daemon.take().expect("daemon bootstrapped");
        let listener = self.listener.take().expect("listener started");
        self.shutdown_result = Some(daemon.shutdown(listener));
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Most recent response.
    #[must_use]
    pub fn last_response(&self) -> Option<&ResponseEnvelope> {
        self.responses.last()
    }

    /// Socket the daemon served, once serving started.
    #[must_use]
    pub fn socket(&self) -> Option<&Utf8PathBuf> {
        self.socket.as_ref()
    }

    /// Outcome of the shutdown step, once run.
    #[must_use]
    pub fn shutdown_result(&self) -> Option<&Result<(), ListenerError>> {
        self.shutdown_result.as_ref()
    }

    fn reset_results(&mut self) {
        self.daemon = None;
        self.listener = None;
        self.socket = None;
        self.bootstrap_error = None;
        self.shutdown_result = None;
        self.responses.clear();
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            let _joined = handle.join();
        }
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
