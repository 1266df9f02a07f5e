//! Method routing for automation requests.
//!
//! The router maps a request's `method` onto the in-process driver, the
//! helper bridge or the stream coordinator. Every outcome, including
//! failures, is an [`AutomationResponse`]; nothing escapes as an error.
//!
//! Dry-run mode is enforced here, before any parameter is inspected, for
//! every method that acts on an application.

use std::sync::Arc;
use std::time::Duration;

use automation_core::{
    ActionKind, AutomationResponse, Diff, RequestEnvelope, Snapshot, StreamToken,
};
use automation_helper::{
    DEFAULT_HELPER_TIMEOUT, HelperApp, HelperChannel, HelperDirectory, capabilities_within,
    observe_within, perform_within, start_stream_within, stop_stream_within,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::{AppTarget, InProcessDriver, ObservationProvider};
use crate::streams::{StreamCoordinator, TickOutcome};

use super::baselines::Baselines;
use super::errors::DispatchError;
use super::params;
use super::session::Session;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const NO_PREVIOUS_SNAPSHOT: &str = "No previous snapshot";

/// Methods understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Liveness check.
    Health,
    /// Supported application registry.
    ListApps,
    /// In-process snapshot, stored as the diff baseline.
    Observe,
    /// Fresh snapshot compared with the stored baseline.
    Diff,
    /// Selector-filtered elements of a fresh snapshot.
    Query,
    /// In-process action.
    Perform,
    /// Helper-delegated URL navigation.
    OpenUrl,
    /// Helper-delegated menu invocation.
    Menu,
    /// Helper-delegated keyboard shortcut.
    Shortcut,
    /// Helper-delegated text entry.
    Type,
    /// Start pushing snapshots for a token.
    StreamStart,
    /// Stop pushing snapshots for a token.
    StreamStop,
    /// Helper-reported capability profile.
    Capabilities,
}

impl Method {
    /// Parses a wire method name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] for names outside the
    /// protocol.
    pub fn parse(name: &str) -> Result<Self, DispatchError> {
        Ok(match name {
            "health" => Self::Health,
            "list_apps" => Self::ListApps,
            "observe" => Self::Observe,
            "diff" => Self::Diff,
            "query" => Self::Query,
            "perform" => Self::Perform,
            "open_url" => Self::OpenUrl,
            "menu" => Self::Menu,
            "shortcut" => Self::Shortcut,
            "type" => Self::Type,
            "observe_stream.start" => Self::StreamStart,
            "observe_stream.stop" => Self::StreamStop,
            "capabilities" => Self::Capabilities,
            other => {
                return Err(DispatchError::UnknownMethod {
                    method: other.to_owned(),
                });
            }
        })
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::ListApps => "list_apps",
            Self::Observe => "observe",
            Self::Diff => "diff",
            Self::Query => "query",
            Self::Perform => "perform",
            Self::OpenUrl => "open_url",
            Self::Menu => "menu",
            Self::Shortcut => "shortcut",
            Self::Type => "type",
            Self::StreamStart => "observe_stream.start",
            Self::StreamStop => "observe_stream.stop",
            Self::Capabilities => "capabilities",
        }
    }

    /// Whether dry-run mode blocks this method.
    #[must_use]
    pub const fn performs_action(self) -> bool {
        matches!(
            self,
            Self::Perform | Self::OpenUrl | Self::Menu | Self::Shortcut | Self::Type
        )
    }

    /// Action kind forced onto helper-delegated requests.
    const fn delegated_kind(self) -> Option<ActionKind> {
        match self {
            Self::OpenUrl => Some(ActionKind::OpenUrl),
            Self::Menu => Some(ActionKind::Menu),
            Self::Shortcut => Some(ActionKind::Shortcut),
            Self::Type => Some(ActionKind::SetValue),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SupportedApp {
    name: &'static str,
    bundle_id: &'static str,
    supported: bool,
}

/// Routes requests to the driver, the helpers and the stream coordinator.
pub struct Router {
    dry_run: bool,
    helper_timeout: Duration,
    driver: InProcessDriver,
    helpers: Arc<dyn HelperDirectory>,
    streams: StreamCoordinator,
    baselines: Arc<Baselines>,
}

impl Router {
    /// Creates a router with dry-run off and the default helper timeout.
    #[must_use]
    pub fn new(
        provider: Arc<dyn ObservationProvider>,
        helpers: Arc<dyn HelperDirectory>,
        streams: StreamCoordinator,
    ) -> Self {
        Self {
            dry_run: false,
            helper_timeout: DEFAULT_HELPER_TIMEOUT,
            driver: InProcessDriver::new(provider),
            helpers,
            streams,
            baselines: Arc::new(Baselines::new()),
        }
    }

    /// Blocks action-performing methods when `dry_run` is set.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the deadline for every helper call.
    #[must_use]
    pub const fn with_helper_timeout(mut self, timeout: Duration) -> Self {
        self.helper_timeout = timeout;
        self
    }

    /// Whether dry-run mode is active.
    #[must_use]
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Baselines shared with stream ticks.
    #[must_use]
    pub fn baselines(&self) -> &Baselines {
        &self.baselines
    }

    /// Serves one request arriving on `session`.
    #[must_use]
    pub fn route(&self, request: &RequestEnvelope, session: &Session) -> AutomationResponse {
        let outcome = Method::parse(&request.method).and_then(|method| {
            debug!(
                target: DISPATCH_TARGET,
                method = method.as_str(),
                session = %session.id(),
                "routing request"
            );
            if self.dry_run && method.performs_action() {
                return Err(DispatchError::DryRun);
            }
            self.dispatch(method, request, session)
        });
        outcome.unwrap_or_else(|error| {
            debug!(
                target: DISPATCH_TARGET,
                method = %request.method,
                %error,
                "request failed"
            );
            error.to_response()
        })
    }

    fn dispatch(
        &self,
        method: Method,
        request: &RequestEnvelope,
        session: &Session,
    ) -> Result<AutomationResponse, DispatchError> {
        match method {
            Method::Health => Ok(AutomationResponse::success("ok")),
            Method::ListApps => Ok(Self::list_apps()),
            Method::Observe => self.observe(request),
            Method::Diff => self.diff(request),
            Method::Query => self.query(request),
            Method::Perform => self.perform(request),
            Method::OpenUrl | Method::Menu | Method::Shortcut | Method::Type => {
                self.delegate(method, request)
            }
            Method::StreamStart => self.start_stream(request, session),
            Method::StreamStop => self.stop_stream(request),
            Method::Capabilities => self.capabilities(request),
        }
    }

    fn list_apps() -> AutomationResponse {
        let apps: Vec<SupportedApp> = HelperApp::ALL
            .iter()
            .map(|app| SupportedApp {
                name: app.display_name(),
                bundle_id: app.bundle_id(),
                supported: true,
            })
            .collect();
        AutomationResponse::success("Supported apps").with_data(&apps)
    }

    fn observe(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let target = self.connect(app)?;
        let snapshot = self.driver.observe(&target);
        self.baselines.replace(app, snapshot.clone());
        Ok(AutomationResponse::success("Observed").with_data(&snapshot))
    }

    fn diff(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let target = self.connect(app)?;
        let current = self.driver.observe(&target);
        let Some(previous) = self.baselines.replace(app, current.clone()) else {
            return Ok(AutomationResponse::success(NO_PREVIOUS_SNAPSHOT).with_data(&current));
        };
        match Diff::between(&previous, &current) {
            Ok(diff) => Ok(AutomationResponse::success(diff.summary.clone())
                .with_changed(diff.changed)
                .with_data(&diff)),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, app, %error, "discarding incomparable baseline");
                Ok(AutomationResponse::success(NO_PREVIOUS_SNAPSHOT).with_data(&current))
            }
        }
    }

    fn query(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let selector = params::selector(request)?;
        let target = self.connect(app)?;
        let elements = self.driver.find(&target, &selector);
        Ok(AutomationResponse::success("Query complete").with_data(&elements))
    }

    fn perform(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let action = params::action(request)?;
        let target = self.connect(app)?;
        Ok(self.driver.perform(&target, &action))
    }

    fn delegate(
        &self,
        method: Method,
        request: &RequestEnvelope,
    ) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let mut action = params::action(request)?;
        if let Some(kind) = method.delegated_kind() {
            action.action = kind;
        }
        let (_, channel) = self.helper(app)?;
        Ok(perform_within(channel.as_ref(), &action, self.helper_timeout))
    }

    fn capabilities(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let (_, channel) = self.helper(app)?;
        let profile = capabilities_within(channel.as_ref(), self.helper_timeout)?;
        Ok(AutomationResponse::success("Capabilities").with_data(&profile))
    }

    fn start_stream(
        &self,
        request: &RequestEnvelope,
        session: &Session,
    ) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let token = params::token(request)?;
        let interval_ms = params::interval_ms(request);
        let (helper_app, channel) = self.helper(app)?;

        self.streams
            .attach(token.clone(), session.writer(), session.id());
        let tick = HelperTick {
            app: app.to_owned(),
            helper_app,
            helpers: Arc::clone(&self.helpers),
            baselines: Arc::clone(&self.baselines),
            timeout: self.helper_timeout,
        };
        if !self
            .streams
            .start(&token, interval_ms, move |previous| tick.run(previous))
        {
            self.streams.detach(&token);
            return Err(DispatchError::StreamStart {
                token: token.to_string(),
            });
        }

        if !start_stream_within(channel.as_ref(), interval_ms, &token, self.helper_timeout) {
            warn!(
                target: DISPATCH_TARGET,
                app = helper_app.display_name(),
                token = %token,
                "helper declined to start its stream"
            );
        }
        info!(
            target: DISPATCH_TARGET,
            app,
            token = %token,
            session = %session.id(),
            "stream started"
        );
        Ok(AutomationResponse::success("Stream started"))
    }

    fn stop_stream(&self, request: &RequestEnvelope) -> Result<AutomationResponse, DispatchError> {
        let app = params::app_name(request)?;
        let token = params::token(request)?;
        if !self.streams.detach(&token) {
            return Ok(AutomationResponse {
                success: false,
                ..AutomationResponse::success("Stream not running")
            });
        }
        self.notify_stream_stopped(app, &token);
        Ok(AutomationResponse::success("Stream stopped"))
    }

    fn notify_stream_stopped(&self, app: &str, token: &StreamToken) {
        let Some(helper_app) = HelperApp::resolve(app) else {
            return;
        };
        let Some(channel) = self.helpers.connection(helper_app) else {
            return;
        };
        if !stop_stream_within(channel.as_ref(), token, self.helper_timeout) {
            debug!(
                target: DISPATCH_TARGET,
                app = helper_app.display_name(),
                token = %token,
                "helper did not confirm stream stop"
            );
        }
    }

    fn connect(&self, app: &str) -> Result<AppTarget, DispatchError> {
        self.driver.connect(app).ok_or(DispatchError::AppNotRunning)
    }

    fn helper(&self, app: &str) -> Result<(HelperApp, Arc<dyn HelperChannel>), DispatchError> {
        let helper_app = HelperApp::resolve(app).ok_or(DispatchError::UnsupportedApp)?;
        let channel = self
            .helpers
            .connection(helper_app)
            .ok_or(DispatchError::HelperUnavailable)?;
        Ok((helper_app, channel))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("dry_run", &self.dry_run)
            .field("helper_timeout", &self.helper_timeout)
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

/// Snapshot source for one helper-backed stream.
///
/// The helper connection is looked up on every tick so a respawned helper
/// is picked up without restarting the stream.
struct HelperTick {
    app: String,
    helper_app: HelperApp,
    helpers: Arc<dyn HelperDirectory>,
    baselines: Arc<Baselines>,
    timeout: Duration,
}

impl HelperTick {
    fn run(&self, previous: Option<&Snapshot>) -> TickOutcome {
        let Some(channel) = self.helpers.connection(self.helper_app) else {
            return TickOutcome::failed(DispatchError::HelperUnavailable.to_string());
        };
        match observe_within(channel.as_ref(), self.timeout) {
            Ok(snapshot) => {
                self.baselines.replace(&self.app, snapshot.clone());
                let diff = previous.and_then(|before| Diff::between(before, &snapshot).ok());
                TickOutcome::observed(snapshot, diff)
            }
            Err(error) => TickOutcome::failed(DispatchError::from(error).to_string()),
        }
    }
}
