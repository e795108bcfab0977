//! Wiring for one page (tab) of the client.
//!
//! [`ClientContext`] constructs every component over a single [`Runtime`] and
//! hands out shared handles. There are no module-level singletons; two
//! contexts over separate runtimes are fully independent.

use std::sync::Arc;

use community_core::{MessageType, UserSummary};

use crate::auth_bridge::AuthBridge;
use crate::bridge::{Subscription, WebViewBridge};
use crate::config::ClientConfig;
use crate::device::DeviceDetector;
use crate::error::ClientError;
use crate::http::SessionClient;
use crate::runtime::Runtime;
use crate::session::SessionState;
use crate::store::AuthSessionStore;

/// All client components for one page.
pub struct ClientContext {
    config: ClientConfig,
    runtime: Runtime,
    detector: Arc<DeviceDetector>,
    bridge: WebViewBridge,
    auth_bridge: AuthBridge,
    session: SessionState,
    http: SessionClient,
    store: AuthSessionStore<SessionClient>,
    shell_logout: Subscription,
}

impl ClientContext {
    /// Build every component.
    ///
    /// A logout announced by the native shell clears the local session
    /// without echoing the message back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, runtime: Runtime) -> Result<Self, ClientError> {
        let detector = Arc::new(DeviceDetector::new(Arc::clone(&runtime.environment)));
        let bridge = WebViewBridge::new(Arc::clone(&runtime.environment));
        let auth_bridge = AuthBridge::new(
            runtime.clone(),
            bridge.clone(),
            Arc::clone(&detector),
            &config,
        );
        let session = SessionState::new(Arc::clone(&runtime.storage));
        let http = SessionClient::new(
            &config,
            runtime.clone(),
            session.clone(),
            auth_bridge.clone(),
        )?;
        let store = AuthSessionStore::new(
            Arc::new(http.clone()),
            session.clone(),
            auth_bridge.clone(),
        );

        let shell_logout = {
            let auth_bridge = auth_bridge.clone();
            let session = session.clone();
            bridge.on_message(MessageType::AuthLogout, move |_| {
                tracing::info!("Native shell signed out");
                auth_bridge.clear_local();
                session.invalidate();
            })
        };

        Ok(Self {
            config,
            runtime,
            detector,
            bridge,
            auth_bridge,
            session,
            http,
            store,
            shell_logout,
        })
    }

    /// Build every component, restore persisted state and, inside the
    /// native shell, report the device classification.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub async fn start(config: ClientConfig, runtime: Runtime) -> Result<Self, ClientError> {
        let context = Self::new(config, runtime)?;
        context.store.rehydrate().await;

        let info = context.detector.device_info();
        if info.is_in_app {
            context.bridge.send_device_info(info);
        }
        Ok(context)
    }

    /// Navigate to the other surface if this one is wrong for the device.
    ///
    /// Returns the URL navigated to.
    pub fn enforce_surface(&self, scheme: &str, host: &str) -> Option<String> {
        let path = self.runtime.navigator.current_path();
        let url = self.detector.redirect_url(scheme, host, &path)?;
        self.runtime.navigator.navigate(&url);
        Some(url)
    }

    /// React to the `auth-sync` event fired by the WebView seeding script.
    ///
    /// If a credential was seeded, the user is fetched from the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error from `GET /auth/me`.
    pub async fn handle_auth_sync(&self) -> Result<Option<UserSummary>, ClientError> {
        let Some(stored) = self.auth_bridge.stored_session() else {
            return Ok(None);
        };
        tracing::info!(user_id = ?stored.user_id, "Credential seeded by native shell");
        self.store.revalidate().await.map(Some)
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Host environment bundle.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Device detector.
    #[must_use]
    pub fn detector(&self) -> &DeviceDetector {
        &self.detector
    }

    /// WebView bridge.
    #[must_use]
    pub const fn bridge(&self) -> &WebViewBridge {
        &self.bridge
    }

    /// Credential replication.
    #[must_use]
    pub const fn auth_bridge(&self) -> &AuthBridge {
        &self.auth_bridge
    }

    /// Shared session state.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// HTTP session client.
    #[must_use]
    pub const fn http(&self) -> &SessionClient {
        &self.http
    }

    /// Authentication store.
    #[must_use]
    pub const fn store(&self) -> &AuthSessionStore<SessionClient> {
        &self.store
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.shell_logout.unsubscribe();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runtime::{
        ChannelShell, KeyValueStore, MemoryNavigator, StaticEnvironment,
    };
    use crate::session::{AuthStatus, keys};

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

    #[tokio::test]
    async fn test_start_hydrates_and_announces_device() {
        let (shell, mut rx) = ChannelShell::new();
        let env = Arc::new(StaticEnvironment::webview(IPHONE, Arc::new(shell)));
        let context = ClientContext::start(ClientConfig::default(), Runtime::in_memory(env))
            .await
            .unwrap();

        assert_eq!(context.store().status(), AuthStatus::Anonymous);
        let announced: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(announced["type"], "DEVICE_INFO");
        assert_eq!(announced["payload"]["platform"], "ios");
    }

    #[tokio::test]
    async fn test_shell_logout_clears_session() {
        let (shell, _rx) = ChannelShell::new();
        let env = Arc::new(StaticEnvironment::webview(IPHONE, Arc::new(shell)));
        let context = ClientContext::start(ClientConfig::default(), Runtime::in_memory(env))
            .await
            .unwrap();

        context
            .runtime()
            .storage
            .set(keys::ACCESS_TOKEN, "abc")
            .unwrap();
        context.store().set_user(community_core::UserSummary {
            id: community_core::UserId::new(5),
            email: None,
            nickname: "neo".to_string(),
            profile_image_url: None,
            role: None,
        });

        let notified = context
            .bridge()
            .dispatch(r#"{"type":"AUTH_LOGOUT","payload":{},"timestamp":1}"#);
        assert_eq!(notified, 1);
        assert_eq!(context.store().status(), AuthStatus::Anonymous);
        assert!(
            context
                .runtime()
                .storage
                .get(keys::ACCESS_TOKEN)
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_enforce_surface_navigates() {
        let env = Arc::new(StaticEnvironment::browser(IPHONE));
        let navigator = Arc::new(MemoryNavigator::new("/posts/9?sort=new"));
        let runtime = Runtime {
            navigator: navigator.clone(),
            ..Runtime::in_memory(env)
        };
        let context = ClientContext::new(ClientConfig::default(), runtime).unwrap();

        let url = context.enforce_surface("https", "www.community.com");
        assert_eq!(url.as_deref(), Some("https://m.community.com/posts/9?sort=new"));
        assert_eq!(navigator.last_navigation(), url);

        assert!(context.enforce_surface("https", "m.community.com").is_none());
    }

    #[tokio::test]
    async fn test_auth_sync_without_credential_is_noop() {
        let env = Arc::new(StaticEnvironment::browser(IPHONE));
        let context = ClientContext::new(ClientConfig::default(), Runtime::in_memory(env)).unwrap();
        assert!(context.handle_auth_sync().await.unwrap().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let env = Arc::new(StaticEnvironment::browser(IPHONE));
        let context = ClientContext::new(ClientConfig::default(), Runtime::in_memory(env)).unwrap();
        let bridge = context.bridge().clone();
        assert_eq!(bridge.listener_count(MessageType::AuthLogout), 1);
        drop(context);
        assert_eq!(bridge.listener_count(MessageType::AuthLogout), 0);
    }
}
