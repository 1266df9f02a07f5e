//! Per-application automation capability metadata.

use serde::{Deserialize, Serialize};

/// Which automation backends are viable for an application.
///
/// Profiles are reported by helpers on demand and are never cached by the
/// daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProfile {
    /// Application name.
    pub app_name: String,
    /// Process identifier of the application.
    pub pid: i32,
    /// Quality of the accessibility tree, from 0.0 to 1.0.
    pub ax_score: f64,
    /// Whether a scripting bridge is available.
    pub supports_scripting_bridge: bool,
    /// Whether the application is scriptable through AppleScript.
    pub supports_apple_script: bool,
    /// Whether the application handles URL schemes.
    pub supports_url_schemes: bool,
    /// RFC 3339 time the profile was computed.
    pub last_updated: String,
}
