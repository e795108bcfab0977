//! User-agent based device classification.
//!
//! User-agent sniffing is the only signal a plain HTTP request carries, so
//! every pattern the platform matches on lives here and nowhere else. The
//! client-side detector and the edge middleware both classify through these
//! functions.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker the native shell's WebView adds to its requests and user agent.
pub const IN_APP_MARKER: &str = "ReactNativeWebView";

static MOBILE_UA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("Invalid regex")
});

static APPLE_UA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|iPhone|iPod").expect("Invalid regex"));

/// Platform the page is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Native shell on iOS.
    Ios,
    /// Native shell on Android.
    Android,
    /// Any plain browser.
    #[default]
    Web,
}

/// Classification of the current runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Running inside the native shell's WebView.
    pub is_in_app: bool,
    /// The user agent looks like a phone or tablet.
    pub is_mobile: bool,
    /// Shell platform, or `web` outside the shell.
    pub platform: Platform,
    /// The raw user agent (empty when unknown).
    pub user_agent: String,
}

impl DeviceInfo {
    /// Classify a runtime from its user agent and whether a native-shell
    /// messaging handle is present.
    ///
    /// A missing user agent yields a desktop `web` classification unless the
    /// shell handle is present.
    #[must_use]
    pub fn classify(user_agent: Option<&str>, has_native_shell: bool) -> Self {
        let user_agent = user_agent.unwrap_or_default();

        let platform = if !has_native_shell {
            Platform::Web
        } else if APPLE_UA.is_match(user_agent) {
            Platform::Ios
        } else {
            Platform::Android
        };

        Self {
            is_in_app: has_native_shell,
            is_mobile: is_mobile_user_agent(user_agent),
            platform,
            user_agent: user_agent.to_owned(),
        }
    }

    /// Classify an incoming HTTP request from its `User-Agent` and
    /// `X-Requested-With` header values.
    #[must_use]
    pub fn from_request_headers(user_agent: Option<&str>, requested_with: Option<&str>) -> Self {
        let in_app = requested_with == Some(IN_APP_MARKER)
            || user_agent.is_some_and(|ua| ua.contains(IN_APP_MARKER));
        Self::classify(user_agent, in_app)
    }
}

/// Whether the user agent belongs to a mobile device.
#[must_use]
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    MOBILE_UA.is_match(user_agent)
}
