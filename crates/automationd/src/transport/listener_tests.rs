//! Tests for the socket listener.

use std::fs;
use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{ConnectionHandler, CountingHandler, ListenerError, SocketListener};

struct SocketDir {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn socket_dir() -> SocketDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("automationd.sock"))
        .expect("utf8 socket path");
    SocketDir { _dir: dir, path }
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn listener_accepts_connections(socket_dir: SocketDir) {
    let listener = SocketListener::bind(&socket_dir.path).expect("bind listener");
    let (accepted, _, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    let _client = UnixStream::connect(&socket_dir.path).expect("connect client");

    assert!(wait_for_count(&accepted, 1), "expected one connection");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn new_client_displaces_previous_one(socket_dir: SocketDir) {
    let listener = SocketListener::bind(&socket_dir.path).expect("bind listener");
    let (accepted, closed, handler) = CountingHandler::new();
    let handle = listener.start(handler).expect("start listener");

    let _first = UnixStream::connect(&socket_dir.path).expect("connect first client");
    assert!(wait_for_count(&accepted, 1), "first client accepted");
    let mut second = UnixStream::connect(&socket_dir.path).expect("connect second client");
    assert!(wait_for_count(&accepted, 2), "second client accepted");

    assert!(wait_for_count(&closed, 1), "first client should be shut down");
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    second.write_all(b"still here").expect("second client stays open");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(wait_for_count(&closed, 2), "shutdown disconnects the live client");
}

#[rstest]
fn listener_cleans_stale_socket_files(socket_dir: SocketDir) {
    {
        let _stale = UnixListener::bind(&socket_dir.path).expect("bind stale listener");
    }
    assert!(socket_dir.path.exists(), "stale socket should remain");

    let listener = SocketListener::bind(&socket_dir.path).expect("bind new listener");
    let (_, _, handler) = CountingHandler::new();
    let handle = listener.start(handler).expect("start listener");

    UnixStream::connect(&socket_dir.path).expect("connect unix client");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(
        !socket_dir.path.exists(),
        "listener should remove unix socket on shutdown"
    );
}

#[rstest]
fn listener_rejects_in_use_socket(socket_dir: SocketDir) {
    let _existing = UnixListener::bind(&socket_dir.path).expect("bind existing listener");

    let error = SocketListener::bind(&socket_dir.path).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[rstest]
fn listener_refuses_to_replace_regular_files(socket_dir: SocketDir) {
    fs::write(&socket_dir.path, b"not a socket").expect("write regular file");

    let error = SocketListener::bind(&socket_dir.path).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    assert!(socket_dir.path.exists(), "regular file must be left alone");
}
