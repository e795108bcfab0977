//! Host environment seams.
//!
//! Everything the session runtime needs from its host (user agent, native
//! shell handle, durable storage, cookies, location) is reached through the
//! traits in this module and handed over in one [`Runtime`] bundle. Nothing
//! in the crate reads process-wide globals.

mod cookies;
mod storage;

pub use cookies::{CookieJar, MemoryCookieJar};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::error::BridgeError;

/// The native shell's single `postMessage(string)` primitive.
pub trait NativeShell: Send + Sync {
    /// Deliver a raw message string to the shell.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError` if the shell cannot accept the message.
    fn post_message(&self, message: &str) -> Result<(), BridgeError>;
}

/// What the page can learn about where it runs.
pub trait HostEnvironment: Send + Sync {
    /// The user agent string, if the host exposes one.
    fn user_agent(&self) -> Option<String>;

    /// The native shell's messaging handle, present only inside the WebView.
    fn native_shell(&self) -> Option<Arc<dyn NativeShell>>;
}

/// Current location and navigation.
pub trait Navigator: Send + Sync {
    /// Path (with query) of the current page.
    fn current_path(&self) -> String;

    /// Navigate to a URL or path.
    fn navigate(&self, url: &str);
}

/// Everything a component needs from its host.
#[derive(Clone)]
pub struct Runtime {
    /// User agent and native shell.
    pub environment: Arc<dyn HostEnvironment>,
    /// Durable key-value storage.
    pub storage: Arc<dyn KeyValueStore>,
    /// Script-visible cookies.
    pub cookies: Arc<dyn CookieJar>,
    /// Location and navigation.
    pub navigator: Arc<dyn Navigator>,
}

impl Runtime {
    /// A runtime backed entirely by in-memory implementations.
    #[must_use]
    pub fn in_memory(environment: Arc<dyn HostEnvironment>) -> Self {
        Self {
            environment,
            storage: Arc::new(MemoryStore::new()),
            cookies: Arc::new(MemoryCookieJar::new()),
            navigator: Arc::new(MemoryNavigator::new("/")),
        }
    }
}

// =============================================================================
// In-process implementations
// =============================================================================

/// Host environment with a fixed (but replaceable) user agent.
#[derive(Default)]
pub struct StaticEnvironment {
    user_agent: RwLock<Option<String>>,
    shell: Option<Arc<dyn NativeShell>>,
}

impl StaticEnvironment {
    /// A plain browser with the given user agent.
    #[must_use]
    pub fn browser(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: RwLock::new(Some(user_agent.into())),
            shell: None,
        }
    }

    /// A WebView inside the native shell.
    #[must_use]
    pub fn webview(user_agent: impl Into<String>, shell: Arc<dyn NativeShell>) -> Self {
        Self {
            user_agent: RwLock::new(Some(user_agent.into())),
            shell: Some(shell),
        }
    }

    /// Replace the reported user agent.
    pub fn set_user_agent(&self, user_agent: Option<String>) {
        *self
            .user_agent
            .write()
            .unwrap_or_else(PoisonError::into_inner) = user_agent;
    }
}

impl HostEnvironment for StaticEnvironment {
    fn user_agent(&self) -> Option<String> {
        self.user_agent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn native_shell(&self) -> Option<Arc<dyn NativeShell>> {
        self.shell.clone()
    }
}

/// Native shell handle that forwards every message into a channel.
#[derive(Debug, Clone)]
pub struct ChannelShell {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelShell {
    /// Create a shell and the receiving end of its messages.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NativeShell for ChannelShell {
    fn post_message(&self, message: &str) -> Result<(), BridgeError> {
        self.sender
            .send(message.to_owned())
            .map_err(|_| BridgeError::Closed)
    }
}

/// Navigator that records navigations instead of performing them.
#[derive(Debug)]
pub struct MemoryNavigator {
    current: RwLock<String>,
    history: RwLock<Vec<String>>,
}

impl MemoryNavigator {
    /// Start at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(path.into()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Move to `path` without recording a navigation (the user clicked a link).
    pub fn set_current_path(&self, path: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    /// Most recent navigation, if any.
    #[must_use]
    pub fn last_navigation(&self) -> Option<String> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Every navigation so far, oldest first.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, url: &str) {
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        self.set_current_path(url);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_shell_forwards_messages() {
        let (shell, mut rx) = ChannelShell::new();
        shell.post_message("hello").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");

        drop(rx);
        assert!(matches!(shell.post_message("gone"), Err(BridgeError::Closed)));
    }

    #[test]
    fn test_static_environment() {
        let browser = StaticEnvironment::browser("Mozilla/5.0");
        assert_eq!(browser.user_agent().as_deref(), Some("Mozilla/5.0"));
        assert!(browser.native_shell().is_none());

        browser.set_user_agent(None);
        assert!(browser.user_agent().is_none());

        let (shell, _rx) = ChannelShell::new();
        let webview = StaticEnvironment::webview("Mozilla/5.0 (iPhone)", Arc::new(shell));
        assert!(webview.native_shell().is_some());
    }

    #[test]
    fn test_memory_navigator_records_history() {
        let nav = MemoryNavigator::new("/posts/1");
        assert_eq!(nav.current_path(), "/posts/1");
        assert!(nav.last_navigation().is_none());

        nav.navigate("/login?redirect=%2Fposts%2F1");
        assert_eq!(
            nav.last_navigation().as_deref(),
            Some("/login?redirect=%2Fposts%2F1")
        );
        assert_eq!(nav.current_path(), "/login?redirect=%2Fposts%2F1");
        assert_eq!(nav.navigations().len(), 1);
    }
}
