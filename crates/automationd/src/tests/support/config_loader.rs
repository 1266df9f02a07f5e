//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use automation_config::Config;
use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that places the socket under a temporary directory.
pub struct TestConfigLoader {
    _socket_dir: TempDir,
    socket: Utf8PathBuf,
    dry_run: bool,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        let socket = Utf8PathBuf::from_path_buf(dir.path().join("automationd.sock"))
            .expect("temporary socket path was not valid UTF-8");
        Self {
            _socket_dir: dir,
            socket,
            dry_run: false,
        }
    }

    /// Enables dry-run in the loaded configuration.
    #[must_use]
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn socket(&self) -> &Utf8PathBuf {
        &self.socket
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            socket: self.socket.clone(),
            dry_run: self.dry_run,
            helper_timeout_ms: 500,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("automationd"),
            OsString::from("--helper-timeout-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_args(args)
    }
}
