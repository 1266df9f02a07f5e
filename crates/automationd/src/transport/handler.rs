//! Connection handling abstraction for the daemon listener.

use std::os::unix::net::UnixStream;

/// Handles accepted socket connections.
///
/// Each connection runs on its own thread. The listener may shut the stream
/// down from another thread when a newer client connects, which surfaces
/// to the handler as end of input.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until it closes. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: UnixStream);
}
