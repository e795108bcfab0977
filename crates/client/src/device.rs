//! Client-side device detection.
//!
//! Classifies the current runtime once per process and answers whether the
//! page should move to the other surface's host.

use std::sync::{Arc, PoisonError, RwLock};

use community_core::{DeviceInfo, RedirectPolicy};

use crate::runtime::HostEnvironment;

/// Caching device classifier bound to a host environment.
pub struct DeviceDetector {
    environment: Arc<dyn HostEnvironment>,
    policy: RedirectPolicy,
    cached: RwLock<Option<DeviceInfo>>,
}

impl DeviceDetector {
    /// Create a detector using the default `www.`/`m.` policy.
    #[must_use]
    pub fn new(environment: Arc<dyn HostEnvironment>) -> Self {
        Self::with_policy(environment, RedirectPolicy::default())
    }

    /// Create a detector with a custom routing policy.
    #[must_use]
    pub fn with_policy(environment: Arc<dyn HostEnvironment>, policy: RedirectPolicy) -> Self {
        Self {
            environment,
            policy,
            cached: RwLock::new(None),
        }
    }

    /// Classify the runtime.
    ///
    /// The first call inspects the environment; later calls return the cached
    /// classification until [`clear_cache`](Self::clear_cache).
    pub fn device_info(&self) -> DeviceInfo {
        if let Some(info) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return info.clone();
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        cached
            .get_or_insert_with(|| {
                let user_agent = self.environment.user_agent();
                let has_shell = self.environment.native_shell().is_some();
                let info = DeviceInfo::classify(user_agent.as_deref(), has_shell);
                tracing::debug!(
                    in_app = info.is_in_app,
                    mobile = info.is_mobile,
                    platform = ?info.platform,
                    "Classified device"
                );
                info
            })
            .clone()
    }

    /// Whether the page is running inside the native shell.
    pub fn is_in_app(&self) -> bool {
        self.device_info().is_in_app
    }

    /// Host the page should move to, or `None` if it is on the right surface.
    pub fn should_redirect(&self, current_host: &str) -> Option<String> {
        let target = self.policy.target_host(current_host, &self.device_info());
        if let Some(target) = &target {
            tracing::info!(from = %current_host, to = %target, "Surface redirect required");
        }
        target
    }

    /// Absolute URL to move to, keeping the path and query.
    pub fn redirect_url(&self, scheme: &str, current_host: &str, path_and_query: &str) -> Option<String> {
        self.policy
            .evaluate(current_host, &self.device_info())
            .map(|decision| decision.location(scheme, path_and_query))
    }

    /// Forget the cached classification.
    pub fn clear_cache(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ChannelShell, StaticEnvironment};
    use community_core::Platform;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
    const DESKTOP: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15";

    #[test]
    fn test_caches_until_cleared() {
        let env = Arc::new(StaticEnvironment::browser(IPHONE));
        let detector = DeviceDetector::new(env.clone());

        let first = detector.device_info();
        env.set_user_agent(Some(DESKTOP.to_string()));
        let second = detector.device_info();
        assert_eq!(first, second);
        assert!(second.is_mobile);

        detector.clear_cache();
        assert!(!detector.device_info().is_mobile);
    }

    #[test]
    fn test_redirect_is_idempotent() {
        let mobile = DeviceDetector::new(Arc::new(StaticEnvironment::browser(IPHONE)));
        let target = mobile.should_redirect("www.community.com");
        assert_eq!(target.as_deref(), Some("m.community.com"));
        assert!(mobile.should_redirect("m.community.com").is_none());

        let desktop = DeviceDetector::new(Arc::new(StaticEnvironment::browser(DESKTOP)));
        let target = desktop.should_redirect("m.community.com");
        assert_eq!(target.as_deref(), Some("www.community.com"));
        assert!(desktop.should_redirect("www.community.com").is_none());
    }

    #[test]
    fn test_no_redirect_for_local_hosts() {
        let mobile = DeviceDetector::new(Arc::new(StaticEnvironment::browser(IPHONE)));
        for host in ["localhost:3000", "www.localhost", "127.0.0.1:8080", "192.168.1.20"] {
            assert!(mobile.should_redirect(host).is_none(), "{host}");
        }
    }

    #[test]
    fn test_shell_never_redirects() {
        let (shell, _rx) = ChannelShell::new();
        let detector =
            DeviceDetector::new(Arc::new(StaticEnvironment::webview(DESKTOP, Arc::new(shell))));
        let info = detector.device_info();
        assert!(info.is_in_app);
        assert_eq!(info.platform, Platform::Android);
        assert!(detector.should_redirect("m.community.com").is_none());
    }

    #[test]
    fn test_missing_user_agent() {
        let env = Arc::new(StaticEnvironment::default());
        let detector = DeviceDetector::new(env);
        let info = detector.device_info();
        assert!(!info.is_in_app);
        assert!(!info.is_mobile);
        assert_eq!(info.platform, Platform::Web);
    }

    #[test]
    fn test_redirect_url_keeps_path() {
        let detector = DeviceDetector::new(Arc::new(StaticEnvironment::browser(IPHONE)));
        assert_eq!(
            detector
                .redirect_url("https", "www.community.com", "/posts/7?page=2")
                .as_deref(),
            Some("https://m.community.com/posts/7?page=2")
        );
    }
}
