//! WebView bridge.
//!
//! Fire-and-forget messaging between the hosted page and the native shell.
//! Outbound messages go through the shell's `postMessage`; inbound message
//! events are handed to [`WebViewBridge::dispatch`] and fanned out to the
//! listeners registered for their type.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use community_core::message::{NotificationPayload, SharePayload};
use community_core::{BridgeMessage, DeviceInfo, MessageType, WebViewMessage};

use crate::runtime::HostEnvironment;

type Listener = Arc<dyn Fn(&BridgeMessage) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<MessageType, Vec<(u64, Listener)>>,
}

/// Outcome of posting a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the shell.
    Delivered,
    /// Not running inside the shell; nothing was sent.
    NoShell,
    /// The shell handle refused or the message could not be encoded.
    Failed,
}

/// Messaging channel to the native shell.
#[derive(Clone)]
pub struct WebViewBridge {
    environment: Arc<dyn HostEnvironment>,
    registry: Arc<RwLock<Registry>>,
}

impl WebViewBridge {
    /// Create a bridge for the given host.
    #[must_use]
    pub fn new(environment: Arc<dyn HostEnvironment>) -> Self {
        Self {
            environment,
            registry: Arc::new(RwLock::new(Registry::default())),
        }
    }

    /// Send a message to the shell, stamped with the current time.
    ///
    /// Outside the shell this only logs a warning. Delivery failures are
    /// logged and reported in the returned [`Delivery`], never raised.
    pub fn post_message(&self, message: BridgeMessage) -> Delivery {
        let kind = message.message_type();
        let Some(shell) = self.environment.native_shell() else {
            tracing::warn!(message_type = ?kind, "No native shell; bridge message dropped");
            return Delivery::NoShell;
        };

        let encoded = match WebViewMessage::now(message).to_json() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(message_type = ?kind, error = %e, "Failed to encode bridge message");
                return Delivery::Failed;
            }
        };

        match shell.post_message(&encoded) {
            Ok(()) => {
                tracing::debug!(message_type = ?kind, "Bridge message posted");
                Delivery::Delivered
            }
            Err(e) => {
                tracing::warn!(message_type = ?kind, error = %e, "Failed to post bridge message");
                Delivery::Failed
            }
        }
    }

    /// Register a listener for inbound messages of one type.
    pub fn on_message<F>(&self, message_type: MessageType, callback: F) -> Subscription
    where
        F: Fn(&BridgeMessage) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .entry(message_type)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            registry: Arc::clone(&self.registry),
            message_type,
            id,
        }
    }

    /// Handle a raw inbound message event.
    ///
    /// Malformed messages are logged and dropped. Returns how many listeners
    /// were notified.
    pub fn dispatch(&self, raw: &str) -> usize {
        let message = match WebViewMessage::from_json(raw) {
            Ok(message) => message.message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed bridge message");
                return 0;
            }
        };

        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<Listener> = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .get(&message.message_type())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(&message);
        }
        listeners.len()
    }

    /// Number of listeners registered for a type.
    #[must_use]
    pub fn listener_count(&self, message_type: MessageType) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .get(&message_type)
            .map_or(0, Vec::len)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Hand a session token to the shell.
    pub fn send_auth_token(&self, token: &str) -> Delivery {
        self.post_message(BridgeMessage::AuthLogin {
            token: token.to_owned(),
        })
    }

    /// Tell the shell the session ended.
    pub fn send_logout(&self) -> Delivery {
        self.post_message(BridgeMessage::AuthLogout {})
    }

    /// Tell the shell the page navigated.
    pub fn send_navigation(&self, url: &str) -> Delivery {
        self.post_message(BridgeMessage::Navigation {
            url: url.to_owned(),
        })
    }

    /// Report the device classification to the shell.
    pub fn send_device_info(&self, info: DeviceInfo) -> Delivery {
        self.post_message(BridgeMessage::DeviceInfo(info))
    }

    /// Ask the shell to open its share sheet.
    pub fn send_share(&self, url: &str, title: Option<&str>, text: Option<&str>) -> Delivery {
        self.post_message(BridgeMessage::Share(SharePayload {
            url: url.to_owned(),
            title: title.map(str::to_owned),
            text: text.map(str::to_owned),
        }))
    }

    /// Ask the shell to show a local notification.
    pub fn send_notification(&self, title: &str, body: Option<&str>) -> Delivery {
        self.post_message(BridgeMessage::Notification(NotificationPayload {
            title: title.to_owned(),
            body: body.map(str::to_owned),
        }))
    }
}

/// Handle returned by [`WebViewBridge::on_message`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    registry: Arc<RwLock<Registry>>,
    message_type: MessageType,
    id: u64,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = registry.listeners.get_mut(&self.message_type) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                registry.listeners.remove(&self.message_type);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;

    use super::*;
    use crate::runtime::{ChannelShell, StaticEnvironment};

    fn webview_bridge() -> (WebViewBridge, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (shell, rx) = ChannelShell::new();
        let env = StaticEnvironment::webview("Mozilla/5.0 (iPhone)", Arc::new(shell));
        (WebViewBridge::new(Arc::new(env)), rx)
    }

    #[test]
    fn test_post_message_wire_format() {
        let (bridge, mut rx) = webview_bridge();
        assert_eq!(bridge.send_auth_token("abc"), Delivery::Delivered);

        let value: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(value["type"], "AUTH_LOGIN");
        assert_eq!(value["payload"]["token"], "abc");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_post_message_without_shell_is_noop() {
        let bridge = WebViewBridge::new(Arc::new(StaticEnvironment::browser("Mozilla/5.0")));
        assert_eq!(bridge.send_logout(), Delivery::NoShell);
    }

    #[test]
    fn test_post_message_reports_closed_shell() {
        let (bridge, rx) = webview_bridge();
        drop(rx);
        assert_eq!(bridge.send_navigation("/posts/1"), Delivery::Failed);
    }

    #[test]
    fn test_dispatch_reaches_matching_listeners() {
        let (bridge, _rx) = webview_bridge();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let sub = bridge.on_message(MessageType::Navigation, move |msg| {
            assert!(matches!(msg, BridgeMessage::Navigation { url } if url == "/posts/3"));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _other = bridge.on_message(MessageType::AuthLogout, |_| {});

        let raw = r#"{"type":"NAVIGATION","payload":{"url":"/posts/3"},"timestamp":1}"#;
        assert_eq!(bridge.dispatch(raw), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(bridge.dispatch(raw), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.listener_count(MessageType::AuthLogout), 1);
    }

    #[test]
    fn test_dispatch_drops_malformed_messages() {
        let (bridge, _rx) = webview_bridge();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = bridge.on_message(MessageType::Navigation, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bridge.dispatch("not json"), 0);
        assert_eq!(bridge.dispatch(r#"{"type":"BOGUS","payload":{},"timestamp":1}"#), 0);
        assert_eq!(
            bridge.dispatch(r#"{"type":"NAVIGATION","payload":{"token":"x"},"timestamp":1}"#),
            0
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Registry still works afterwards
        assert_eq!(
            bridge.dispatch(r#"{"type":"NAVIGATION","payload":{"url":"/"},"timestamp":1}"#),
            1
        );
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let (bridge, _rx) = webview_bridge();
        let slot: Arc<RwLock<Option<Subscription>>> = Arc::new(RwLock::new(None));
        let inner = Arc::clone(&slot);
        let sub = bridge.on_message(MessageType::AuthLogout, move |_| {
            if let Some(sub) = inner.read().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.write().unwrap() = Some(sub);

        let raw = r#"{"type":"AUTH_LOGOUT","payload":{},"timestamp":1}"#;
        assert_eq!(bridge.dispatch(raw), 1);
        assert_eq!(bridge.dispatch(raw), 0);
    }

    #[test]
    fn test_share_and_notification_helpers() {
        let (bridge, mut rx) = webview_bridge();
        bridge.send_share("https://m.community.com/posts/1", Some("Post"), None);
        bridge.send_notification("New comment", Some("neo replied"));

        let share: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(share["type"], "SHARE");
        assert_eq!(share["payload"]["title"], "Post");
        assert!(share["payload"].get("text").is_none());

        let note: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(note["type"], "NOTIFICATION");
        assert_eq!(note["payload"]["body"], "neo replied");
    }
}
