//! Timer-driven observation streams pushed to connected clients.
//!
//! Each subscription is keyed by a client-chosen [`StreamToken`]. A client
//! first attaches the writer of its connection, then starts a timer whose
//! ticks run a caller-supplied closure on a dedicated thread. Whatever the
//! closure returns is framed as [`StreamEvent`]s on the attached writer,
//! sharing the wire with ordinary responses.
//!
//! The coordinator owns cadence and delivery only; how a tick obtains its
//! snapshot is up to the closure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use automation_core::{Diff, Snapshot, StreamEvent, StreamEventKind, StreamToken};
use automation_framing::FrameSink;
use serde::Serialize;
use tracing::{debug, info, warn};

const STREAMS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::streams");

/// Shortest interval between two ticks of one subscription.
pub const MIN_STREAM_INTERVAL: Duration = Duration::from_millis(250);

/// Interval used when a client does not ask for one.
pub const DEFAULT_STREAM_INTERVAL_MS: u64 = 1000;

/// Identifies the client connection that attached a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates an identifier unique within this process.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// What one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Fresh snapshot, pushed as a `snapshot` event.
    pub snapshot: Option<Snapshot>,
    /// Diff against the previous tick, pushed as a `diff` event.
    pub diff: Option<Diff>,
    /// Failure description, pushed as an `error` event.
    pub error: Option<String>,
}

impl TickOutcome {
    /// A tick that produced a snapshot and, when a previous one existed, a
    /// diff.
    #[must_use]
    pub const fn observed(snapshot: Snapshot, diff: Option<Diff>) -> Self {
        Self {
            snapshot: Some(snapshot),
            diff,
            error: None,
        }
    }

    /// A tick that could not obtain a snapshot.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct TickError<'a> {
    message: &'a str,
}

/// Clamps a requested interval to [`MIN_STREAM_INTERVAL`].
#[must_use]
pub fn effective_interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms).max(MIN_STREAM_INTERVAL)
}

struct Timer {
    generation: u64,
    // Dropping the sender wakes the tick thread and ends it.
    _cancel: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

struct Subscription {
    writer: Arc<dyn FrameSink>,
    session: SessionId,
    timer: Option<Timer>,
    last_snapshot: Option<Snapshot>,
}

#[derive(Default)]
struct Registry {
    subscriptions: HashMap<StreamToken, Subscription>,
    generations: u64,
}

impl Registry {
    /// Last-seen snapshot for a live timer; `None` once the timer is gone.
    fn previous(&self, token: &StreamToken, generation: u64) -> Option<Option<Snapshot>> {
        self.subscriptions
            .get(token)
            .filter(|subscription| subscription.is_current(generation))
            .map(|subscription| subscription.last_snapshot.clone())
    }
}

impl Subscription {
    fn is_current(&self, generation: u64) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|timer| timer.generation == generation)
    }
}

/// Registry of stream subscriptions and their tick threads.
#[derive(Clone, Default)]
pub struct StreamCoordinator {
    registry: Arc<Mutex<Registry>>,
}

impl StreamCoordinator {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `writer` as the destination for `token`'s events.
    ///
    /// Re-attaching replaces the writer and keeps any running timer.
    pub fn attach(&self, token: StreamToken, writer: Arc<dyn FrameSink>, session: SessionId) {
        let mut registry = self.lock();
        match registry.subscriptions.get_mut(&token) {
            Some(subscription) => {
                subscription.writer = writer;
                subscription.session = session;
            }
            None => {
                registry.subscriptions.insert(
                    token,
                    Subscription {
                        writer,
                        session,
                        timer: None,
                        last_snapshot: None,
                    },
                );
            }
        }
    }

    /// Starts ticking `token` every `interval_ms`, clamped to
    /// [`MIN_STREAM_INTERVAL`], with the first tick immediately.
    ///
    /// `on_tick` receives this subscription's last-seen snapshot. Starting a
    /// token that already streams replaces its timer. Returns `false` when
    /// no writer is attached for `token`.
    pub fn start<F>(&self, token: &StreamToken, interval_ms: u64, on_tick: F) -> bool
    where
        F: FnMut(Option<&Snapshot>) -> TickOutcome + Send + 'static,
    {
        let interval = effective_interval(interval_ms);
        let mut registry = self.lock();
        registry.generations += 1;
        let generation = registry.generations;
        let Some(subscription) = registry.subscriptions.get_mut(token) else {
            warn!(
                target: STREAMS_TARGET,
                token = %token,
                "cannot start a stream without an attached writer"
            );
            return false;
        };

        let (cancel, cancelled) = mpsc::channel();
        let ticker = Ticker {
            registry: Arc::clone(&self.registry),
            token: token.clone(),
            generation,
            interval,
        };
        let thread = thread::Builder::new()
            .name(format!("stream-{token}"))
            .spawn(move || ticker.run(&cancelled, on_tick));
        let thread = match thread {
            Ok(handle) => handle,
            Err(error) => {
                warn!(
                    target: STREAMS_TARGET,
                    token = %token,
                    error = %error,
                    "failed to spawn stream thread"
                );
                return false;
            }
        };

        let replaced = subscription
            .timer
            .replace(Timer {
                generation,
                _cancel: cancel,
                thread: Some(thread),
            })
            .is_some();
        info!(
            target: STREAMS_TARGET,
            token = %token,
            interval_ms = interval.as_millis(),
            replaced,
            "stream started"
        );
        true
    }

    /// Cancels `token`'s timer and forgets its writer and last snapshot.
    ///
    /// Returns whether the token was known.
    pub fn detach(&self, token: &StreamToken) -> bool {
        let removed = self.lock().subscriptions.remove(token);
        if removed.is_some() {
            info!(target: STREAMS_TARGET, token = %token, "stream detached");
        }
        removed.is_some()
    }

    /// Detaches every token attached by `session`; returns how many.
    pub fn detach_session(&self, session: SessionId) -> usize {
        let mut registry = self.lock();
        let before = registry.subscriptions.len();
        registry
            .subscriptions
            .retain(|_, subscription| subscription.session != session);
        let detached = before - registry.subscriptions.len();
        if detached > 0 {
            info!(
                target: STREAMS_TARGET,
                session = %session,
                detached,
                "detached streams of closed session"
            );
        }
        detached
    }

    /// Cancels every subscription and waits for the tick threads to end.
    pub fn stop_all(&self) {
        let drained: Vec<Subscription> = self
            .lock()
            .subscriptions
            .drain()
            .map(|(_, subscription)| subscription)
            .collect();
        let mut threads = Vec::new();
        for mut subscription in drained {
            if let Some(mut timer) = subscription.timer.take() {
                threads.extend(timer.thread.take());
            }
        }
        for thread in threads {
            if thread.join().is_err() {
                warn!(target: STREAMS_TARGET, "stream thread panicked");
            }
        }
    }

    /// Whether `token` has a running timer.
    #[must_use]
    pub fn is_streaming(&self, token: &StreamToken) -> bool {
        self.lock()
            .subscriptions
            .get(token)
            .is_some_and(|subscription| subscription.timer.is_some())
    }

    /// Number of attached tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Whether no token is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StreamCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCoordinator")
            .field("subscriptions", &self.len())
            .finish()
    }
}

/// Per-timer state moved onto the tick thread.
struct Ticker {
    registry: Arc<Mutex<Registry>>,
    token: StreamToken,
    generation: u64,
    interval: Duration,
}

impl Ticker {
    fn run<F>(&self, cancelled: &mpsc::Receiver<()>, mut on_tick: F)
    where
        F: FnMut(Option<&Snapshot>) -> TickOutcome,
    {
        let mut deadline = Instant::now();
        loop {
            let Some(previous) = self.lock().previous(&self.token, self.generation) else {
                break;
            };
            let outcome = on_tick(previous.as_ref());
            if !self.publish(outcome) {
                break;
            }

            deadline += self.interval;
            let wait = deadline.saturating_duration_since(Instant::now());
            match cancelled.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(target: STREAMS_TARGET, token = %self.token, "stream thread finished");
    }

    /// Records the outcome and writes its events; `false` once the timer
    /// has been cancelled or replaced.
    fn publish(&self, outcome: TickOutcome) -> bool {
        let writer = {
            let mut registry = self.lock();
            let Some(subscription) = registry
                .subscriptions
                .get_mut(&self.token)
                .filter(|subscription| subscription.is_current(self.generation))
            else {
                return false;
            };
            if let Some(snapshot) = &outcome.snapshot {
                subscription.last_snapshot = Some(snapshot.clone());
            }
            Arc::clone(&subscription.writer)
        };

        if let Some(snapshot) = &outcome.snapshot {
            self.send(writer.as_ref(), StreamEventKind::Snapshot, snapshot);
        }
        if let Some(diff) = &outcome.diff {
            self.send(writer.as_ref(), StreamEventKind::Diff, diff);
        }
        if let Some(message) = &outcome.error {
            self.send(writer.as_ref(), StreamEventKind::Error, &TickError { message });
        }
        true
    }

    fn send<T: Serialize + ?Sized>(&self, writer: &dyn FrameSink, kind: StreamEventKind, data: &T) {
        let body = StreamEvent::new(self.token.clone(), kind, data)
            .and_then(|event| serde_json::to_vec(&event));
        let result = match body {
            Ok(bytes) => writer.send_raw(&bytes),
            Err(error) => Err(error.into()),
        };
        if let Err(error) = result {
            warn!(
                target: STREAMS_TARGET,
                token = %self.token,
                event = ?kind,
                error = %error,
                "failed to push stream event"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
