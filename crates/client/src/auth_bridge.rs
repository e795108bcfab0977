//! Credential replication across surfaces.
//!
//! A session credential lives in up to four places at once: in-memory app
//! state, the shared parent-domain cookies, durable storage and the native
//! shell. [`AuthBridge`] writes each replica independently. A failure in one
//! channel is logged and reported, never rolled back, and never stops the
//! other channels.

use std::sync::Arc;

use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use secrecy::{ExposeSecret, SecretString};

use community_core::UserId;

use crate::bridge::{Delivery, WebViewBridge};
use crate::config::ClientConfig;
use crate::device::DeviceDetector;
use crate::runtime::{KeyValueStore, Runtime, StorageError};
use crate::session::keys;

/// Event the injection script dispatches once storage is seeded.
pub const AUTH_SYNC_EVENT: &str = "auth-sync";

/// Outcome of one replication channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The replica was written (or cleared).
    Written,
    /// The channel does not apply here (for example no native shell).
    Skipped,
    /// The write failed; see the logs.
    Failed,
}

impl From<Delivery> for ChannelOutcome {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Delivered => Self::Written,
            Delivery::NoShell => Self::Skipped,
            Delivery::Failed => Self::Failed,
        }
    }
}

/// Per-channel result of a sync or logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Native shell notification.
    pub shell: ChannelOutcome,
    /// Shared-domain cookies.
    pub cookies: ChannelOutcome,
    /// Durable storage.
    pub storage: ChannelOutcome,
}

impl SyncReport {
    /// Whether no channel failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        ![self.shell, self.cookies, self.storage].contains(&ChannelOutcome::Failed)
    }
}

/// How [`AuthBridge::reconcile`] resolved cookie and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Both replicas agreed.
    InSync,
    /// The cookie is gone, so the stored credential was removed.
    StorageCleared,
    /// The cookie holds another credential, which replaced the stored one.
    StorageRefreshed,
}

/// Credential read back from durable storage.
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// The access token.
    pub token: SecretString,
    /// The user id, when stored alongside.
    pub user_id: Option<UserId>,
}

/// Replicates the session credential to cookies, storage and the shell.
#[derive(Clone)]
pub struct AuthBridge {
    runtime: Runtime,
    bridge: WebViewBridge,
    detector: Arc<DeviceDetector>,
    cookie_domain: String,
    cookie_max_age: i64,
}

impl AuthBridge {
    /// Create a bridge using the cookie settings from `config`.
    #[must_use]
    pub fn new(
        runtime: Runtime,
        bridge: WebViewBridge,
        detector: Arc<DeviceDetector>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            runtime,
            bridge,
            detector,
            cookie_domain: config.cookie_domain.clone(),
            cookie_max_age: config.cookie_max_age,
        }
    }

    /// Replicate a freshly issued credential to every channel.
    pub fn sync_auth_to_native(&self, token: &SecretString, user_id: UserId) -> SyncReport {
        let token = token.expose_secret();
        let user_id = user_id.to_string();

        let shell = if self.detector.is_in_app() {
            self.bridge.send_auth_token(token).into()
        } else {
            ChannelOutcome::Skipped
        };

        let cookies = self.write_cookies(&[
            (keys::ACCESS_TOKEN, token, self.cookie_max_age),
            (keys::USER_ID, &user_id, self.cookie_max_age),
        ]);

        let storage = self.write_storage(|storage| {
            storage.set(keys::ACCESS_TOKEN, token)?;
            storage.set(keys::USER_ID, &user_id)
        });

        let report = SyncReport {
            shell,
            cookies,
            storage,
        };
        if report.is_complete() {
            tracing::info!(user_id = %user_id, "Session credential replicated");
        } else {
            tracing::warn!(user_id = %user_id, ?report, "Session credential partially replicated");
        }
        report
    }

    /// Remove the credential from every channel and tell the shell.
    ///
    /// Safe to call when nothing is stored.
    pub fn logout(&self) -> SyncReport {
        let shell = if self.detector.is_in_app() {
            self.bridge.send_logout().into()
        } else {
            ChannelOutcome::Skipped
        };
        let (cookies, storage) = self.clear_local();

        let report = SyncReport {
            shell,
            cookies,
            storage,
        };
        tracing::info!(?report, "Session credential cleared");
        report
    }

    /// Expire the shared cookies and remove the stored credential without
    /// notifying the shell.
    pub fn clear_local(&self) -> (ChannelOutcome, ChannelOutcome) {
        let cookies = self.write_cookies(&[(keys::ACCESS_TOKEN, "", 0), (keys::USER_ID, "", 0)]);
        let storage = self.write_storage(|storage| {
            storage.remove(keys::ACCESS_TOKEN)?;
            storage.remove(keys::USER_ID)?;
            storage.remove(keys::REFRESH_TOKEN)
        });
        (cookies, storage)
    }

    /// Script that seeds a fresh WebView with the credential.
    ///
    /// Returns an empty string when there is no token.
    #[must_use]
    pub fn injection_script(&self, token: Option<&str>, user_id: Option<UserId>) -> String {
        injection_script(token, user_id, &self.cookie_domain, self.cookie_max_age)
    }

    /// Read the credential back from durable storage.
    #[must_use]
    pub fn stored_session(&self) -> Option<StoredSession> {
        let storage = &self.runtime.storage;
        let token = match storage.get(keys::ACCESS_TOKEN) {
            Ok(token) => token?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credential");
                return None;
            }
        };
        let user_id = storage
            .get(keys::USER_ID)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok());

        Some(StoredSession {
            token: SecretString::from(token),
            user_id,
        })
    }

    /// Make durable storage agree with the shared cookies.
    ///
    /// The shared cookie is authoritative. A missing cookie removes the
    /// stored credential; a different cookie value overwrites it.
    pub fn reconcile(&self) -> Reconciliation {
        let cookie_token = self.runtime.cookies.get(keys::ACCESS_TOKEN);
        let stored_token = self
            .runtime
            .storage
            .get(keys::ACCESS_TOKEN)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read stored credential");
                None
            });

        match (cookie_token, stored_token) {
            (None, None) => Reconciliation::InSync,
            (Some(cookie), Some(stored)) if cookie == stored => Reconciliation::InSync,
            (None, Some(_)) => {
                self.write_storage(|storage| {
                    storage.remove(keys::ACCESS_TOKEN)?;
                    storage.remove(keys::USER_ID)
                });
                tracing::info!("Shared cookie expired; stored credential removed");
                Reconciliation::StorageCleared
            }
            (Some(cookie), _) => {
                let user_id = self.runtime.cookies.get(keys::USER_ID);
                self.write_storage(|storage| {
                    storage.set(keys::ACCESS_TOKEN, &cookie)?;
                    match &user_id {
                        Some(id) => storage.set(keys::USER_ID, id),
                        None => storage.remove(keys::USER_ID),
                    }
                });
                tracing::info!("Stored credential replaced from shared cookie");
                Reconciliation::StorageRefreshed
            }
        }
    }

    fn write_cookies(&self, entries: &[(&'static str, &str, i64)]) -> ChannelOutcome {
        let mut outcome = ChannelOutcome::Written;
        for (name, value, max_age) in entries {
            let cookie = Cookie::build((*name, (*value).to_owned()))
                .path("/")
                .domain(self.cookie_domain.clone())
                .max_age(Duration::seconds(*max_age))
                .same_site(SameSite::Lax)
                .build();
            if let Err(e) = self.runtime.cookies.set(cookie) {
                tracing::warn!(cookie = *name, error = %e, "Failed to write session cookie");
                outcome = ChannelOutcome::Failed;
            }
        }
        outcome
    }

    fn write_storage<F>(&self, write: F) -> ChannelOutcome
    where
        F: FnOnce(&dyn KeyValueStore) -> Result<(), StorageError>,
    {
        match write(self.runtime.storage.as_ref()) {
            Ok(()) => ChannelOutcome::Written,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to update stored credential");
                ChannelOutcome::Failed
            }
        }
    }
}

/// Build the WebView seeding script.
///
/// The script writes `accessToken` and `userId` to `localStorage` and to the
/// shared cookies, then dispatches the `auth-sync` event. Values are embedded
/// as JSON string literals. Returns an empty string when there is no token.
#[must_use]
pub fn injection_script(
    token: Option<&str>,
    user_id: Option<UserId>,
    cookie_domain: &str,
    max_age: i64,
) -> String {
    let Some(token) = token else {
        return String::new();
    };

    let attributes = js_string(&format!(
        "; path=/; domain={cookie_domain}; max-age={max_age}; SameSite=Lax"
    ));
    let mut statements = vec![assign(keys::ACCESS_TOKEN, &js_string(token), &attributes)];
    if let Some(user_id) = user_id {
        statements.push(assign(
            keys::USER_ID,
            &js_string(&user_id.to_string()),
            &attributes,
        ));
    }

    format!(
        "(function() {{\n  try {{\n{}    window.dispatchEvent(new Event({}));\n  }} catch (e) {{\n    console.error('auth injection failed', e);\n  }}\n}})();\ntrue;\n",
        statements.concat(),
        js_string(AUTH_SYNC_EVENT),
    )
}

fn assign(key: &str, value: &str, attributes: &str) -> String {
    let key = js_string(key);
    format!(
        "    localStorage.setItem({key}, {value});\n    document.cookie = {key} + '=' + encodeURIComponent({value}) + {attributes};\n"
    )
}

/// Encode as a JavaScript string literal.
fn js_string(value: &str) -> String {
    // JSON strings are valid JS literals apart from U+2028/U+2029 and "</script>"
    serde_json::to_string(value)
        .unwrap_or_default()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
        .replace("</", "<\\/")
}
