//! Shared session state.
//!
//! [`SessionState`] is the single in-memory copy of the client auth state for
//! one tab. The store mutates it, the HTTP client invalidates it on 401, and
//! UI code reads snapshots or subscribes to changes. Only `{user,
//! isAuthenticated}` is ever written to durable storage.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use community_core::UserSummary;

use crate::runtime::{KeyValueStore, StorageError};

/// Durable storage and cookie keys.
pub mod keys {
    /// Bearer token (storage and cookie).
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Signed-in user id (storage and cookie).
    pub const USER_ID: &str = "userId";
    /// Refresh token. The client only ever removes it.
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Persisted auth blob.
    pub const AUTH_STORAGE: &str = "auth-storage";
}

/// Version written into the persisted auth blob.
const PERSIST_VERSION: u32 = 0;

/// The client auth state.
///
/// Once `has_hydrated` is true, `is_authenticated == user.is_some()`.
/// Before that the values are provisional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAuthState {
    /// The signed-in user.
    pub user: Option<UserSummary>,
    /// Whether a user is signed in.
    pub is_authenticated: bool,
    /// A login, register or logout call is in flight.
    pub is_loading: bool,
    /// Message from the last failed call.
    pub error: Option<String>,
    /// Persisted state has been restored.
    pub has_hydrated: bool,
}

/// Authentication status with "not yet known" kept distinct from anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// Persisted state not restored yet.
    Unknown,
    /// Nobody is signed in.
    Anonymous,
    /// A user is signed in.
    Authenticated(UserSummary),
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedAuth {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    user: Option<UserSummary>,
    #[serde(default)]
    is_authenticated: bool,
}

/// Shared, observable auth state for one tab.
#[derive(Clone)]
pub struct SessionState {
    state: Arc<watch::Sender<ClientAuthState>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionState {
    /// Create an empty, not yet hydrated state persisting to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(ClientAuthState::default());
        Self {
            state: Arc::new(state),
            storage,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ClientAuthState {
        self.state.borrow().clone()
    }

    /// Current authentication status.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        let state = self.state.borrow();
        if !state.has_hydrated {
            return AuthStatus::Unknown;
        }
        match &state.user {
            Some(user) => AuthStatus::Authenticated(user.clone()),
            None => AuthStatus::Anonymous,
        }
    }

    /// Receive every subsequent state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientAuthState> {
        self.state.subscribe()
    }

    /// Apply a change to the state.
    pub(crate) fn update(&self, change: impl FnOnce(&mut ClientAuthState)) {
        self.state.send_modify(change);
    }

    /// Sign out locally and persist the anonymous state.
    pub fn invalidate(&self) {
        self.update(|state| {
            state.user = None;
            state.is_authenticated = false;
            state.is_loading = false;
        });
        self.persist();
        tracing::info!("Session invalidated");
    }

    /// Write `{user, isAuthenticated}` to durable storage.
    ///
    /// Failures are logged; in-memory state stays authoritative for the tab.
    pub fn persist(&self) {
        let blob = {
            let state = self.state.borrow();
            PersistedAuth {
                state: PersistedState {
                    user: state.user.clone(),
                    is_authenticated: state.is_authenticated,
                },
                version: PERSIST_VERSION,
            }
        };

        let result = serde_json::to_string(&blob)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.set(keys::AUTH_STORAGE, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist auth state");
        }
    }

    /// Read the persisted user, if any.
    ///
    /// A blob claiming to be authenticated without a user is read as
    /// anonymous.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read or the blob is corrupt.
    pub fn load_persisted(&self) -> Result<Option<UserSummary>, StorageError> {
        let Some(raw) = self.storage.get(keys::AUTH_STORAGE)? else {
            return Ok(None);
        };
        let blob: PersistedAuth = serde_json::from_str(&raw)?;
        if blob.version != PERSIST_VERSION {
            tracing::warn!(version = blob.version, "Ignoring auth state from another version");
            return Ok(None);
        }
        Ok(blob.state.user)
    }

    /// Mark the state as hydrated. Returns `false` if it already was.
    pub fn mark_hydrated(&self) -> bool {
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.has_hydrated, true))
    }

    /// Whether persisted state has been restored.
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.state.borrow().has_hydrated
    }

    /// Resolve once persisted state has been restored.
    pub async fn wait_hydrated(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|state| state.has_hydrated).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::runtime::MemoryStore;
    use community_core::UserId;

    fn user() -> UserSummary {
        UserSummary {
            id: UserId::new(5),
            email: None,
            nickname: "neo".to_string(),
            profile_image_url: None,
            role: Some("USER".to_string()),
        }
    }

    #[test]
    fn test_status_unknown_until_hydrated() {
        let session = SessionState::new(Arc::new(MemoryStore::new()));
        assert_eq!(session.status(), AuthStatus::Unknown);

        assert!(session.mark_hydrated());
        assert!(!session.mark_hydrated());
        assert_eq!(session.status(), AuthStatus::Anonymous);

        session.update(|state| {
            state.user = Some(user());
            state.is_authenticated = true;
        });
        assert_eq!(session.status(), AuthStatus::Authenticated(user()));
    }

    #[test]
    fn test_persisted_blob_shape() {
        let storage = Arc::new(MemoryStore::new());
        let session = SessionState::new(storage.clone());
        session.update(|state| {
            state.user = Some(user());
            state.is_authenticated = true;
            state.error = Some("ignored".to_string());
        });
        session.persist();

        let raw = storage.get(keys::AUTH_STORAGE).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["isAuthenticated"], true);
        assert_eq!(value["state"]["user"]["nickname"], "neo");
        assert!(value["state"].get("error").is_none());
        assert!(!raw.contains("accessToken"));

        assert_eq!(session.load_persisted().unwrap(), Some(user()));
    }

    #[test]
    fn test_invalidate_persists_anonymous() {
        let storage = Arc::new(MemoryStore::new());
        let session = SessionState::new(storage.clone());
        session.update(|state| {
            state.user = Some(user());
            state.is_authenticated = true;
        });
        session.invalidate();

        let snapshot = session.snapshot();
        assert!(snapshot.user.is_none());
        assert!(!snapshot.is_authenticated);

        let raw = storage.get(keys::AUTH_STORAGE).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["state"]["user"], serde_json::Value::Null);
        assert_eq!(value["state"]["isAuthenticated"], false);
    }

    #[test]
    fn test_load_rejects_corrupt_blob() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::AUTH_STORAGE, "{").unwrap();
        let session = SessionState::new(storage);
        assert!(matches!(
            session.load_persisted(),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_hydrated_resolves() {
        let session = SessionState::new(Arc::new(MemoryStore::new()));
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_hydrated().await })
        };
        tokio::task::yield_now().await;
        session.mark_hydrated();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();

        // Already hydrated: returns immediately
        session.wait_hydrated().await;
    }
}
