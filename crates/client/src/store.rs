//! The tab-scoped authentication store.
//!
//! # State machine
//!
//! ```text
//! anonymous --login()--> authenticating --ok--> authenticated
//!                              |                     |
//!                              +--err--> anonymous   +--logout()--> anonymous
//!
//! hydrating --rehydrate()--> hydrated      (orthogonal, happens once)
//! ```
//!
//! The store talks to the backend through [`AuthBackend`] and replicates the
//! credential through [`AuthBridge`].

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretString;

use community_core::UserSummary;
use community_core::auth::{AuthResponse, LoginRequest, RegisterRequest};

use crate::auth_bridge::{AuthBridge, Reconciliation};
use crate::error::ClientError;
use crate::session::{AuthStatus, ClientAuthState, SessionState};

/// Message shown when a login fails without a backend message.
pub const LOGIN_FAILED: &str = "Login failed.";

/// Message shown when a registration fails without a backend message.
pub const REGISTRATION_FAILED: &str = "Registration failed.";

/// The backend auth endpoints the store depends on.
pub trait AuthBackend: Send + Sync {
    /// `POST /auth/login`.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    /// `POST /auth/register`.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `POST /auth/logout`.
    fn logout(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `GET /auth/me`.
    fn current_user(&self) -> impl Future<Output = Result<UserSummary, ClientError>> + Send;
}

/// Authentication store for one tab.
pub struct AuthSessionStore<B> {
    backend: Arc<B>,
    session: SessionState,
    auth_bridge: AuthBridge,
}

impl<B> Clone for AuthSessionStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            auth_bridge: self.auth_bridge.clone(),
        }
    }
}

impl<B: AuthBackend> AuthSessionStore<B> {
    /// Create a store over shared session state.
    #[must_use]
    pub const fn new(backend: Arc<B>, session: SessionState, auth_bridge: AuthBridge) -> Self {
        Self {
            backend,
            session,
            auth_bridge,
        }
    }

    /// Sign in.
    ///
    /// On success the user is stored and persisted, and a returned token is
    /// replicated to cookies, storage and the native shell.
    ///
    /// # Errors
    ///
    /// Returns the backend error after recording its message in the state.
    /// A session that was already established is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSummary, ClientError> {
        self.session.update(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let result = match LoginRequest::new(email, password) {
            Ok(request) => self.backend.login(&request).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(response) => {
                let user = response.user.clone();
                self.session.update(|state| {
                    state.user = Some(user.clone());
                    state.is_authenticated = true;
                    state.is_loading = false;
                });
                self.session.persist();

                if let Some(token) = response.access_token {
                    self.auth_bridge
                        .sync_auth_to_native(&SecretString::from(token), user.id);
                }
                tracing::info!(user_id = %user.id, "Logged in");
                Ok(user)
            }
            Err(e) => {
                let message = e.user_message(LOGIN_FAILED);
                tracing::warn!(error = %e, "Login failed");
                // An existing session survives a failed attempt
                self.session.update(|state| {
                    state.error = Some(message);
                    state.is_loading = false;
                });
                Err(e)
            }
        }
    }

    /// Create an account. Never signs the new user in.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input, or the backend error.
    /// Either way the message is recorded in the state.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<(), ClientError> {
        self.session.update(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let result = match RegisterRequest::new(email, password, nickname) {
            Ok(request) => self.backend.register(&request).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(()) => {
                self.session.update(|state| state.is_loading = false);
                tracing::info!("Registered new account");
            }
            Err(e) => {
                let message = e.user_message(REGISTRATION_FAILED);
                tracing::warn!(error = %e, "Registration failed");
                self.session.update(|state| {
                    state.error = Some(message);
                    state.is_loading = false;
                });
            }
        }
        result
    }

    /// Sign out.
    ///
    /// Local state is cleared and the credential removed from every replica
    /// whether or not the backend call succeeds.
    pub async fn logout(&self) {
        self.session.update(|state| state.is_loading = true);

        if let Err(e) = self.backend.logout().await {
            tracing::warn!(error = %e, "Backend logout failed; clearing local session anyway");
        }

        self.session.update(|state| {
            state.user = None;
            state.is_authenticated = false;
            state.is_loading = false;
        });
        self.session.persist();
        self.auth_bridge.logout();
    }

    /// Replace the current user (session discovered out of band).
    pub fn set_user(&self, user: UserSummary) {
        self.session.update(|state| {
            state.user = Some(user);
            state.is_authenticated = true;
        });
        self.session.persist();
    }

    /// Clear the last error message.
    pub fn clear_error(&self) {
        self.session.update(|state| state.error = None);
    }

    /// Restore persisted state.
    ///
    /// Cookie and storage are reconciled first. Whatever happens, the state
    /// is marked hydrated exactly once.
    pub async fn rehydrate(&self) {
        if self.session.is_hydrated() {
            return;
        }

        let reconciliation = self.auth_bridge.reconcile();

        let session = self.session.clone();
        let loaded = tokio::task::spawn_blocking(move || session.load_persisted()).await;

        let user = match loaded {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to restore auth state");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Auth state restore task failed");
                None
            }
        };

        // A cleared shared cookie means the session ended on another surface
        let user = if reconciliation == Reconciliation::StorageCleared {
            None
        } else {
            user
        };

        self.session.update(|state| {
            if !state.has_hydrated && state.user.is_none() {
                state.is_authenticated = user.is_some();
                state.user = user;
            }
        });
        if reconciliation == Reconciliation::StorageCleared {
            self.session.persist();
        }

        if self.session.mark_hydrated() {
            tracing::debug!(
                authenticated = self.session.snapshot().is_authenticated,
                "Auth state hydrated"
            );
        }
    }

    /// Resolve once [`rehydrate`](Self::rehydrate) has completed.
    pub async fn wait_hydrated(&self) {
        self.session.wait_hydrated().await;
    }

    /// Ask the backend who is signed in and refresh the stored user.
    ///
    /// # Errors
    ///
    /// Returns the backend error. A rejected session has already been
    /// invalidated by the HTTP client.
    pub async fn revalidate(&self) -> Result<UserSummary, ClientError> {
        let user = self.backend.current_user().await?;
        self.set_user(user.clone());
        Ok(user)
    }

    /// Current authentication status.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.session.status()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ClientAuthState {
        self.session.snapshot()
    }

    /// The shared session state.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }
}
