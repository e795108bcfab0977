//! HTTP session client.
//!
//! [`SessionClient`] is the single gateway to the backend. It attaches the
//! session credential to every request and treats a 401 from any endpoint
//! as a revoked session: the local session is torn down and the page is
//! sent to the login screen with a `redirect` back to where it was.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = SessionClient::new(&config, runtime, session, auth_bridge)?;
//! let me: UserSummary = client.get("auth/me").await?;
//! ```

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use community_core::UserSummary;
use community_core::auth::{ApiEnvelope, AuthResponse, LoginRequest, RegisterRequest};

use crate::auth_bridge::AuthBridge;
use crate::config::{ClientConfig, CredentialMode};
use crate::error::ClientError;
use crate::runtime::Runtime;
use crate::session::{SessionState, keys};
use crate::store::AuthBackend;

/// Auth endpoints whose 401 means "wrong credentials", not "session revoked".
const UNAUTHORIZED_EXEMPT: &[&str] = &["auth/login", "auth/register", "auth/logout"];

/// Backend client carrying the session credential.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<SessionClientInner>,
}

struct SessionClientInner {
    client: reqwest::Client,
    api_url: Url,
    credential_mode: CredentialMode,
    login_path: String,
    runtime: Runtime,
    session: SessionState,
    auth_bridge: AuthBridge,
}

impl SessionClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        runtime: Runtime,
        session: SessionState,
        auth_bridge: AuthBridge,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        if config.credential_mode == CredentialMode::Cookie {
            builder = builder.cookie_store(true);
        }

        Ok(Self {
            inner: Arc::new(SessionClientInner {
                client: builder.build()?,
                api_url: config.api_url.clone(),
                credential_mode: config.credential_mode,
                login_path: config.login_path.clone(),
                runtime,
                session,
                auth_bridge,
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.inner.api_url
    }

    /// `GET` a path relative to the API base and unwrap the envelope.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send::<(), T>(Method::GET, path, None)
            .await?
            .ok_or_else(|| missing_data(path))
    }

    /// `POST` a JSON body to a path relative to the API base and unwrap the
    /// envelope.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body))
            .await?
            .ok_or_else(|| missing_data(path))
    }

    /// Send a request and return the envelope's `data`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Unauthorized` on 401 (after invalidating the session)
    /// - `ClientError::Api` for other non-success statuses or envelopes
    /// - `ClientError::Http` for transport failures and timeouts
    /// - `ClientError::Decode` for unreadable bodies
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let path = path.trim_start_matches('/');
        let mut request = self.request(method.clone(), path)?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // The body of a revoked-session response is never needed
        if status == StatusCode::UNAUTHORIZED && !is_unauthorized_exempt(path) {
            tracing::warn!(%method, path, "Session rejected by backend");
            self.handle_unauthorized();
            return Err(ClientError::Unauthorized);
        }

        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            tracing::debug!(%method, path, status = status.as_u16(), "Backend returned error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(None);
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self
            .inner
            .api_url
            .join(path)
            .map_err(|e| ClientError::Validation(format!("invalid API path {path:?}: {e}")))?;
        let mut request = self.inner.client.request(method, url);

        if self.inner.credential_mode == CredentialMode::Bearer {
            match self.inner.runtime.storage.get(keys::ACCESS_TOKEN) {
                Ok(Some(token)) => request = request.bearer_auth(token),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Failed to read access token"),
            }
        }
        Ok(request)
    }

    /// Tear down the local session and send the page to login.
    fn handle_unauthorized(&self) {
        self.inner.auth_bridge.logout();
        self.inner.session.invalidate();

        let navigator = &self.inner.runtime.navigator;
        let current = navigator.current_path();
        let current_route = current.split(['?', '#']).next().unwrap_or_default();
        if current_route == self.inner.login_path {
            return;
        }

        let target = format!(
            "{}?redirect={}",
            self.inner.login_path,
            urlencoding::encode(&current)
        );
        tracing::info!(redirect = %current, "Redirecting to login");
        navigator.navigate(&target);
    }
}

impl AuthBackend for SessionClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.post("auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        self.send::<_, serde_json::Value>(Method::POST, "auth/register", Some(request))
            .await
            .map(|_| ())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.send::<(), serde_json::Value>(Method::POST, "auth/logout", None)
            .await
            .map(|_| ())
    }

    async fn current_user(&self) -> Result<UserSummary, ClientError> {
        self.get("auth/me").await
    }
}

fn is_unauthorized_exempt(path: &str) -> bool {
    let route = path.split('?').next().unwrap_or_default();
    UNAUTHORIZED_EXEMPT.contains(&route)
}

fn missing_data(path: &str) -> ClientError {
    ClientError::Decode(format!("response to {path:?} carried no data"))
}
