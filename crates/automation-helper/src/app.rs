//! Applications served by out-of-process helpers.

use std::fmt;

use serde::Serialize;

/// Application with a dedicated helper process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HelperApp {
    /// Safari web browser.
    Safari,
    /// Messages.
    Messages,
}

impl HelperApp {
    /// Every helper-backed application, in registry order.
    pub const ALL: [Self; 2] = [Self::Safari, Self::Messages];

    /// Maps a client-supplied application name onto a helper-backed app.
    ///
    /// Matching trims surrounding whitespace, ignores case and accepts any
    /// name containing the app's key, so `"Safari Technology Preview"`
    /// resolves to [`HelperApp::Safari`].
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        let normalised = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|app| normalised.contains(app.key()))
    }

    /// Display name used on the wire.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Safari => "Safari",
            Self::Messages => "Messages",
        }
    }

    /// Platform bundle identifier.
    #[must_use]
    pub const fn bundle_id(self) -> &'static str {
        match self {
            Self::Safari => "com.apple.Safari",
            Self::Messages => "com.apple.MobileSMS",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Safari => "safari",
            Self::Messages => "messages",
        }
    }
}

impl fmt::Display for HelperApp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.display_name())
    }
}
