use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Socket path used when no override is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/app-automation.sock";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Milliseconds a blocking helper call waits before giving up.
pub const DEFAULT_HELPER_TIMEOUT_MS: u64 = 5_000;

/// Default socket path for the daemon.
#[must_use]
pub fn default_socket_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SOCKET_PATH)
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default helper timeout in milliseconds.
#[must_use]
pub const fn default_helper_timeout_ms() -> u64 {
    DEFAULT_HELPER_TIMEOUT_MS
}
