//! Desktop/mobile host routing policy.
//!
//! Visitors are routed to the surface built for their device by host prefix:
//! the desktop site lives under the desktop marker (`www.`) and the mobile
//! site under the mobile marker (`m.`). The same [`RedirectPolicy`] is
//! evaluated by the client-side detector and by the edge middleware.
//!
//! # Invariants
//!
//! - Never redirects inside the native shell.
//! - Never redirects `localhost`, IPv4 literals or bracketed IPv6 literals.
//! - Idempotent: evaluating on a decision's target host yields no redirect.
//! - Unrecognized host shapes resolve to "no redirect".

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::device::DeviceInfo;

/// Default desktop subdomain marker.
pub const DESKTOP_MARKER: &str = "www.";

/// Default mobile subdomain marker.
pub const MOBILE_MARKER: &str = "m.";

static IPV4_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("Invalid regex"));

/// Errors constructing a [`RedirectPolicy`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A marker is empty or does not end with a dot.
    #[error("host marker {0:?} must be a non-empty label ending with '.'")]
    InvalidMarker(String),
    /// One marker is a prefix of the other, which would make the policy loop.
    #[error("host markers {desktop:?} and {mobile:?} overlap")]
    OverlappingMarkers {
        /// Desktop marker.
        desktop: String,
        /// Mobile marker.
        mobile: String,
    },
}

/// How a redirect should be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectKind {
    /// Desktop visitor on the mobile host: a misrouted bookmark, safe to cache.
    Permanent,
    /// Mobile visitor on the desktop host: may be deliberate, revisit each time.
    Temporary,
}

impl RedirectKind {
    /// HTTP status code for this kind of redirect.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Permanent => 301,
            Self::Temporary => 302,
        }
    }
}

/// Outcome of evaluating the policy for a host that must change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    /// Host the visitor should be sent to (port preserved).
    pub host: String,
    /// Permanent or temporary.
    pub kind: RedirectKind,
}

impl RedirectDecision {
    /// Build the absolute redirect URL, keeping the original path and query.
    #[must_use]
    pub fn location(&self, scheme: &str, path_and_query: &str) -> String {
        let path = if path_and_query.starts_with('/') {
            path_and_query.to_owned()
        } else {
            format!("/{path_and_query}")
        };
        format!("{scheme}://{}{path}", self.host)
    }
}

/// The host routing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    desktop_marker: String,
    mobile_marker: String,
    promote_bare_hosts: bool,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            desktop_marker: DESKTOP_MARKER.to_owned(),
            mobile_marker: MOBILE_MARKER.to_owned(),
            promote_bare_hosts: false,
        }
    }
}

impl RedirectPolicy {
    /// Create a policy with custom markers.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if a marker is malformed or the markers overlap.
    pub fn new(desktop_marker: &str, mobile_marker: &str) -> Result<Self, PolicyError> {
        let desktop = normalize_marker(desktop_marker)?;
        let mobile = normalize_marker(mobile_marker)?;

        if desktop.starts_with(&mobile) || mobile.starts_with(&desktop) {
            return Err(PolicyError::OverlappingMarkers { desktop, mobile });
        }

        Ok(Self {
            desktop_marker: desktop,
            mobile_marker: mobile,
            promote_bare_hosts: false,
        })
    }

    /// Also send mobile visitors on a host without the mobile marker (for
    /// example the bare apex domain) to the mobile host.
    ///
    /// The edge applies this rule; the in-page detector does not.
    #[must_use]
    pub const fn with_bare_host_promotion(mut self, enabled: bool) -> Self {
        self.promote_bare_hosts = enabled;
        self
    }

    /// Desktop marker in use.
    #[must_use]
    pub fn desktop_marker(&self) -> &str {
        &self.desktop_marker
    }

    /// Mobile marker in use.
    #[must_use]
    pub fn mobile_marker(&self) -> &str {
        &self.mobile_marker
    }

    /// Evaluate the policy for a host and device.
    ///
    /// Returns `None` when the visitor is already on the right surface.
    #[must_use]
    pub fn evaluate(&self, host: &str, device: &DeviceInfo) -> Option<RedirectDecision> {
        if device.is_in_app {
            return None;
        }

        let host = host.trim().to_ascii_lowercase();
        if host.is_empty() || is_local_host(&host) {
            return None;
        }

        if !device.is_mobile {
            return host
                .strip_prefix(&self.mobile_marker)
                .map(|rest| RedirectDecision {
                    host: format!("{}{rest}", self.desktop_marker),
                    kind: RedirectKind::Permanent,
                });
        }

        if host.starts_with(&self.mobile_marker) {
            return None;
        }

        if let Some(rest) = host.strip_prefix(&self.desktop_marker) {
            return Some(RedirectDecision {
                host: format!("{}{rest}", self.mobile_marker),
                kind: RedirectKind::Temporary,
            });
        }

        self.promote_bare_hosts.then(|| RedirectDecision {
            host: format!("{}{host}", self.mobile_marker),
            kind: RedirectKind::Temporary,
        })
    }

    /// Target host only, or `None` when no redirect is needed.
    #[must_use]
    pub fn target_host(&self, host: &str, device: &DeviceInfo) -> Option<String> {
        self.evaluate(host, device).map(|decision| decision.host)
    }
}

/// Whether a host is a development or address-literal host that must never
/// be redirected.
#[must_use]
pub fn is_local_host(host: &str) -> bool {
    host.contains("localhost") || host.starts_with('[') || IPV4_PREFIX.is_match(host)
}

fn normalize_marker(marker: &str) -> Result<String, PolicyError> {
    let marker = marker.trim().to_ascii_lowercase();
    if marker.len() < 2 || !marker.ends_with('.') || marker.starts_with('.') {
        return Err(PolicyError::InvalidMarker(marker));
    }
    Ok(marker)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::device::Platform;

    fn device(is_mobile: bool, is_in_app: bool) -> DeviceInfo {
        DeviceInfo {
            is_in_app,
            is_mobile,
            platform: Platform::Web,
            user_agent: String::new(),
        }
    }

    const HOSTS: &[&str] = &[
        "www.community.com",
        "m.community.com",
        "community.com",
        "m.community.com:8443",
        "www.community.com:3000",
        "api.community.com",
        "WWW.Community.com",
        "",
    ];

    #[test]
    fn test_desktop_on_mobile_host_is_permanent() {
        let decision = RedirectPolicy::default()
            .evaluate("m.community.com", &device(false, false))
            .unwrap();
        assert_eq!(decision.host, "www.community.com");
        assert_eq!(decision.kind, RedirectKind::Permanent);
        assert_eq!(decision.kind.status_code(), 301);
    }

    #[test]
    fn test_mobile_on_desktop_host_is_temporary() {
        let decision = RedirectPolicy::default()
            .evaluate("www.community.com", &device(true, false))
            .unwrap();
        assert_eq!(decision.host, "m.community.com");
        assert_eq!(decision.kind, RedirectKind::Temporary);
    }

    #[test]
    fn test_port_is_preserved() {
        let target = RedirectPolicy::default().target_host("m.community.com:8443", &device(false, false));
        assert_eq!(target.as_deref(), Some("www.community.com:8443"));
    }

    #[test]
    fn test_marker_must_be_a_prefix() {
        // "platform." contains "m." but is not on the mobile host
        let policy = RedirectPolicy::default();
        assert!(policy.evaluate("www.platform.com", &device(false, false)).is_none());
        assert!(policy.evaluate("team.platform.com", &device(true, false)).is_none());
    }

    #[test]
    fn test_never_redirects_in_app() {
        let policy = RedirectPolicy::default().with_bare_host_promotion(true);
        for host in HOSTS {
            assert!(policy.evaluate(host, &device(true, true)).is_none());
            assert!(policy.evaluate(host, &device(false, true)).is_none());
        }
    }

    #[test]
    fn test_never_redirects_local_hosts() {
        let policy = RedirectPolicy::default().with_bare_host_promotion(true);
        let local = [
            "localhost:3000",
            "m.localhost",
            "www.localhost:8080",
            "127.0.0.1:3000",
            "192.168.0.12",
            "10.0.0.1:80",
            "[::1]:3000",
        ];
        for host in local {
            for mobile in [true, false] {
                assert!(
                    policy.evaluate(host, &device(mobile, false)).is_none(),
                    "{host} mobile={mobile}"
                );
            }
        }
    }

    #[test]
    fn test_redirects_never_loop() {
        for promote in [false, true] {
            let policy = RedirectPolicy::default().with_bare_host_promotion(promote);
            for host in HOSTS {
                for mobile in [true, false] {
                    let device = device(mobile, false);
                    if let Some(first) = policy.evaluate(host, &device) {
                        assert!(
                            policy.evaluate(&first.host, &device).is_none(),
                            "{host} -> {} loops (mobile={mobile})",
                            first.host
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_bare_host_promotion() {
        let plain = RedirectPolicy::default();
        assert!(plain.evaluate("community.com", &device(true, false)).is_none());

        let edge = RedirectPolicy::default().with_bare_host_promotion(true);
        let decision = edge.evaluate("community.com", &device(true, false)).unwrap();
        assert_eq!(decision.host, "m.community.com");
        assert_eq!(decision.kind, RedirectKind::Temporary);

        // Desktop visitors on the apex stay put
        assert!(edge.evaluate("community.com", &device(false, false)).is_none());
    }

    #[test]
    fn test_location_keeps_path_and_query() {
        let decision = RedirectDecision {
            host: "m.community.com".to_string(),
            kind: RedirectKind::Temporary,
        };
        assert_eq!(
            decision.location("https", "/posts/12?tab=comments"),
            "https://m.community.com/posts/12?tab=comments"
        );
        assert_eq!(decision.location("http", ""), "http://m.community.com/");
    }

    #[test]
    fn test_custom_markers() {
        let policy = RedirectPolicy::new("desktop.", "mobile.").unwrap();
        let target = policy.target_host("mobile.community.com", &device(false, false));
        assert_eq!(target.as_deref(), Some("desktop.community.com"));
    }

    #[test]
    fn test_rejects_bad_markers() {
        assert!(matches!(
            RedirectPolicy::new("www", "m."),
            Err(PolicyError::InvalidMarker(_))
        ));
        assert!(matches!(
            RedirectPolicy::new("m.", "m."),
            Err(PolicyError::OverlappingMarkers { .. })
        ));
    }
}
