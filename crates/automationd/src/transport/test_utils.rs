//! Test helpers for the transport module.

use std::io::Read;
use std::os::unix::net::UnixStream;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::ConnectionHandler;

/// Counts connections and, once counted, reads each until it closes.
pub(crate) struct CountingHandler {
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Returns the accepted and closed counters alongside the handler.
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Self>) {
        let accepted = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            accepted: Arc::clone(&accepted),
            closed: Arc::clone(&closed),
        });
        (accepted, closed, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, mut stream: UnixStream) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        let _read = stream.read_to_end(&mut sink);
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
