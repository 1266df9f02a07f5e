//! Framed JSON-RPC connection to one helper process.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use automation_core::{Action, AutomationResponse, CapabilityProfile, Snapshot, StreamToken};
use automation_framing::{MessageReader, MessageWriter};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::app::HelperApp;
use crate::channel::{HelperChannel, Reply};
use crate::error::HelperError;
use crate::jsonrpc::{HelperReply, HelperRequest, methods};

/// Log target for helper connections.
pub(crate) const CONNECTION_TARGET: &str = "automation_helper::connection";

type PendingReply = Box<dyn FnOnce(Option<Value>) + Send>;

/// Requests awaiting a reply, keyed by request id.
#[derive(Default)]
struct PendingReplies {
    map: Mutex<HashMap<i64, PendingReply>>,
    closed: AtomicBool,
}

impl PendingReplies {
    /// Registers `reply`, handing it back when the connection is closed.
    fn register(&self, id: i64, reply: PendingReply) -> Result<(), PendingReply> {
        let mut map = self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            return Err(reply);
        }
        map.insert(id, reply);
        Ok(())
    }

    fn take(&self, id: i64) -> Option<PendingReply> {
        self.map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&id)
    }

    /// Marks the connection closed and fails every outstanding request.
    fn close(&self) {
        let drained: Vec<PendingReply> = {
            let mut map = self
                .map
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            self.closed.store(true, Ordering::SeqCst);
            map.drain().map(|(_, reply)| reply).collect()
        };
        for reply in drained {
            reply(None);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Live connection to a helper over a pair of byte streams.
///
/// A background thread reads replies and completes the matching callbacks.
/// When the helper's output ends or becomes unreadable the connection
/// closes and every pending callback receives its failure value.
pub struct HelperConnection {
    app: HelperApp,
    writer: MessageWriter<Box<dyn Write + Send>>,
    pending: Arc<PendingReplies>,
}

impl HelperConnection {
    /// Starts a connection reading replies from `input` and writing
    /// requests to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::SpawnFailed`] when the reader thread cannot be
    /// started.
    pub fn start<R, W>(app: HelperApp, input: R, output: W) -> Result<Self, HelperError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let pending = Arc::new(PendingReplies::default());
        let reader_pending = Arc::clone(&pending);
        thread::Builder::new()
            .name(format!("helper-{}", app.display_name().to_lowercase()))
            .spawn(move || read_replies(app, input, &reader_pending))
            .map_err(|source| HelperError::SpawnFailed {
                message: format!("failed to start reply reader for {app}"),
                source: Arc::new(source),
            })?;

        Ok(Self {
            app,
            writer: MessageWriter::new(Box::new(output)),
            pending,
        })
    }

    /// Application this connection serves.
    #[must_use]
    pub const fn app(&self) -> HelperApp {
        self.app
    }

    /// Closes the connection, failing every pending call.
    pub fn invalidate(&self) {
        self.pending.close();
    }

    fn call(&self, method: &str, params: Option<Value>, reply: PendingReply) {
        let request = HelperRequest::new(method, params);
        let id = request.id;
        if let Err(reply) = self.pending.register(id, reply) {
            reply(None);
            return;
        }

        debug!(
            target: CONNECTION_TARGET,
            app = %self.app,
            method,
            id,
            "sending helper request"
        );
        if let Err(error) = self.writer.write_json(&request) {
            warn!(
                target: CONNECTION_TARGET,
                app = %self.app,
                method,
                error = %error,
                "failed to write helper request"
            );
            self.pending.close();
            if let Some(reply) = self.pending.take(id) {
                reply(None);
            }
        }
    }
}

impl HelperChannel for HelperConnection {
    fn capabilities(&self, reply: Reply<Option<CapabilityProfile>>) {
        self.call(methods::CAPABILITIES, None, decoded(self.app, reply));
    }

    fn observe(&self, reply: Reply<Option<Snapshot>>) {
        self.call(methods::OBSERVE, None, decoded(self.app, reply));
    }

    fn perform(&self, action: &Action, reply: Reply<Option<AutomationResponse>>) {
        match serde_json::to_value(action) {
            Ok(action) => self.call(
                methods::PERFORM,
                Some(json!({ "action": action })),
                decoded(self.app, reply),
            ),
            Err(error) => {
                warn!(
                    target: CONNECTION_TARGET,
                    app = %self.app,
                    error = %error,
                    "failed to encode action"
                );
                reply(None);
            }
        }
    }

    fn start_stream(&self, interval_ms: u64, token: &StreamToken, reply: Reply<bool>) {
        self.call(
            methods::START_STREAM,
            Some(json!({ "intervalMs": interval_ms, "token": token })),
            flag(reply),
        );
    }

    fn stop_stream(&self, token: &StreamToken, reply: Reply<bool>) {
        self.call(
            methods::STOP_STREAM,
            Some(json!({ "token": token })),
            flag(reply),
        );
    }

    fn is_open(&self) -> bool {
        !self.pending.is_closed()
    }
}

impl std::fmt::Debug for HelperConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperConnection")
            .field("app", &self.app)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

fn decoded<T>(app: HelperApp, reply: Reply<Option<T>>) -> PendingReply
where
    T: DeserializeOwned + 'static,
{
    Box::new(move |value| {
        let decoded = value.and_then(|value| match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(
                    target: CONNECTION_TARGET,
                    app = %app,
                    error = %error,
                    "discarding undecodable helper reply"
                );
                None
            }
        });
        reply(decoded);
    })
}

fn flag(reply: Reply<bool>) -> PendingReply {
    Box::new(move |value| reply(value.and_then(|value| value.as_bool()).unwrap_or(false)))
}

fn read_replies<R: Read>(app: HelperApp, input: R, pending: &PendingReplies) {
    let mut reader = MessageReader::new(input);
    loop {
        let body = match reader.next_message() {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!(target: CONNECTION_TARGET, app = %app, "helper output closed");
                break;
            }
            Err(error) => {
                warn!(
                    target: CONNECTION_TARGET,
                    app = %app,
                    error = %error,
                    "helper output unreadable"
                );
                break;
            }
        };

        let reply = match serde_json::from_slice::<HelperReply>(&body) {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    target: CONNECTION_TARGET,
                    app = %app,
                    error = %error,
                    "skipping malformed helper message"
                );
                continue;
            }
        };

        let Some(id) = reply.id else {
            warn!(
                target: CONNECTION_TARGET,
                app = %app,
                error = ?reply.error,
                "helper reported an error without a request id"
            );
            continue;
        };
        let Some(callback) = pending.take(id) else {
            warn!(
                target: CONNECTION_TARGET,
                app = %app,
                id,
                "skipping reply with no pending request"
            );
            continue;
        };

        if let Some(error) = reply.error {
            warn!(
                target: CONNECTION_TARGET,
                app = %app,
                id,
                code = error.code,
                message = %error.message,
                "helper returned an error"
            );
            callback(None);
        } else {
            callback(reply.result);
        }
    }
    pending.close();
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::os::unix::net::UnixStream;
    use std::sync::mpsc;
    use std::time::Duration;

    use automation_core::{ActionKind, ErrorCode, Snapshot};
    use automation_framing::MessageReader;
    use rstest::rstest;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    /// Connection wired to an in-memory helper end.
    struct Harness {
        connection: HelperConnection,
        helper_reader: MessageReader<BufReader<UnixStream>>,
        helper_writer: MessageWriter<UnixStream>,
    }

    impl Harness {
        fn new() -> Self {
            let (daemon_out, helper_in) = UnixStream::pair().expect("request pipe");
            let (helper_out, daemon_in) = UnixStream::pair().expect("reply pipe");
            let connection =
                HelperConnection::start(HelperApp::Safari, daemon_in, daemon_out).expect("start");
            Self {
                connection,
                helper_reader: MessageReader::new(BufReader::new(helper_in)),
                helper_writer: MessageWriter::new(helper_out),
            }
        }

        fn next_request(&mut self) -> HelperRequest {
            let body = self
                .helper_reader
                .next_message()
                .expect("read request")
                .expect("request before close");
            serde_json::from_slice(&body).expect("decode request")
        }

        fn reply(&self, reply: &HelperReply) {
            self.helper_writer.write_json(reply).expect("write reply");
        }
    }

    fn capture<T: Send + 'static>() -> (Reply<T>, mpsc::Receiver<T>) {
        let (sender, receiver) = mpsc::channel();
        let reply: Reply<T> = Box::new(move |value| {
            sender.send(value).expect("receiver alive");
        });
        (reply, receiver)
    }

    #[rstest]
    fn observe_round_trips_through_helper() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        harness.connection.observe(reply);

        let request = harness.next_request();
        assert_eq!(request.method, "observe");
        let snapshot = Snapshot::captured_at("2024-05-01T10:00:00Z", "Safari", 7, Vec::new());
        harness.reply(&HelperReply::result(
            request.id,
            serde_json::to_value(&snapshot).expect("encode snapshot"),
        ));

        let received = receiver.recv_timeout(WAIT).expect("reply delivered");
        assert_eq!(received, Some(snapshot));
    }

    #[rstest]
    fn perform_sends_action_payload() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        let action = Action::new(ActionKind::OpenUrl).with_param("url", "https://example.com");
        harness.connection.perform(&action, reply);

        let request = harness.next_request();
        assert_eq!(request.method, "perform");
        let params = request.params.expect("params");
        assert_eq!(params["action"]["action"], "openUrl");
        assert_eq!(params["action"]["params"]["url"], "https://example.com");

        let response = AutomationResponse::failure(ErrorCode::UnsupportedAction, "nope");
        harness.reply(&HelperReply::result(
            request.id,
            serde_json::to_value(&response).expect("encode response"),
        ));
        assert_eq!(receiver.recv_timeout(WAIT).expect("reply"), Some(response));
    }

    #[rstest]
    fn stream_control_decodes_booleans() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        harness
            .connection
            .start_stream(500, &StreamToken::new("tok"), reply);

        let request = harness.next_request();
        assert_eq!(request.method, "startStream");
        let params = request.params.expect("params");
        assert_eq!(params["intervalMs"], 500);
        assert_eq!(params["token"], "tok");

        harness.reply(&HelperReply::result(request.id, Value::Bool(true)));
        assert!(receiver.recv_timeout(WAIT).expect("reply"));
    }

    #[rstest]
    fn error_replies_complete_with_failure_value() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        harness.connection.capabilities(reply);

        let request = harness.next_request();
        harness.reply(&HelperReply::error(Some(request.id), -32_000, "broken"));
        assert_eq!(receiver.recv_timeout(WAIT).expect("reply"), None);
        assert!(harness.connection.is_open());
    }

    #[rstest]
    fn undecodable_result_completes_with_none() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        harness.connection.observe(reply);

        let request = harness.next_request();
        harness.reply(&HelperReply::result(request.id, json!("not a snapshot")));
        assert_eq!(receiver.recv_timeout(WAIT).expect("reply"), None);
    }

    #[rstest]
    fn closed_output_fails_pending_calls() {
        let mut harness = Harness::new();
        let (reply, receiver) = capture();
        harness.connection.observe(reply);
        let _request = harness.next_request();

        drop(harness.helper_writer);

        assert_eq!(receiver.recv_timeout(WAIT).expect("failure delivered"), None);
        let deadline = std::time::Instant::now() + WAIT;
        while harness.connection.is_open() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!harness.connection.is_open());
    }

    #[rstest]
    fn invalidated_connection_fails_immediately() {
        let harness = Harness::new();
        harness.connection.invalidate();

        let (reply, receiver) = capture();
        harness
            .connection
            .stop_stream(&StreamToken::new("tok"), reply);
        assert!(!receiver.recv_timeout(WAIT).expect("reply"));
    }
}
