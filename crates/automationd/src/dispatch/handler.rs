//! Connection handler that serves framed JSON-RPC requests.
//!
//! Requests on one connection are handled in arrival order and each gets
//! exactly one response. Stream events started from the connection share its
//! writer, so responses and events never interleave within a frame.

use std::os::unix::net::UnixStream;
use std::sync::Arc;

use automation_core::{RequestEnvelope, RequestId, ResponseEnvelope};
use automation_framing::{FrameSink, MessageReader, MessageWriter};
use tracing::{debug, info, warn};

use crate::streams::StreamCoordinator;
use crate::transport::ConnectionHandler;

use super::errors::DispatchError;
use super::router::{DISPATCH_TARGET, Router};
use super::session::Session;

/// Reads requests from a connection until it closes and answers each one.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    router: Router,
    streams: StreamCoordinator,
}

impl DispatchConnectionHandler {
    /// Creates a handler; `streams` must be the coordinator `router` uses.
    #[must_use]
    pub const fn new(router: Router, streams: StreamCoordinator) -> Self {
        Self { router, streams }
    }

    /// Router serving this handler's requests.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    fn dispatch(&self, stream: UnixStream) {
        let write_half = match stream.try_clone() {
            Ok(write_half) => write_half,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to split connection");
                return;
            }
        };
        let writer = Arc::new(MessageWriter::new(write_half));
        let session = Session::new(Arc::clone(&writer) as Arc<dyn FrameSink>);
        info!(target: DISPATCH_TARGET, session = %session.id(), "client connected");

        let mut reader = MessageReader::new(stream);
        loop {
            match reader.next_message() {
                Ok(Some(body)) => {
                    let response = self.respond(&body, &session);
                    if let Err(error) = writer.write_json(&response) {
                        warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, session = %session.id(), "client disconnected");
                    break;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "closing connection after framing error");
                    break;
                }
            }
        }

        let detached = self.streams.detach_session(session.id());
        info!(
            target: DISPATCH_TARGET,
            session = %session.id(),
            detached,
            "client session closed"
        );
    }

    fn respond(&self, body: &[u8], session: &Session) -> ResponseEnvelope {
        match RequestEnvelope::from_slice(body) {
            Ok(request) => {
                let result = self.router.route(&request, session);
                ResponseEnvelope::new(request.id, result)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                ResponseEnvelope::new(
                    RequestId::unknown(),
                    DispatchError::InvalidPayload.to_response(),
                )
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: UnixStream) {
        self.dispatch(stream);
    }
}
