//! In-process stand-in for the backend auth API.
//!
//! Serves `/api/v1/auth/{login,logout,register,me}` and a protected
//! `/api/v1/posts` with the same envelope shape as the real backend. The
//! session is issued either as a bearer token in the login body or as an
//! HTTP-only `accessToken` cookie, and can be revoked to simulate an expired
//! session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Account the mock accepts.
pub const EMAIL: &str = "neo@community.com";
/// Its password.
pub const PASSWORD: &str = "Secret1!";
/// Token issued on login.
pub const TOKEN: &str = "token-abc";
/// Its user ID.
pub const USER_ID: i64 = 5;

/// How the mock hands out the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    /// Token in the login response body.
    Bearer,
    /// HTTP-only cookie; the body carries no token.
    Cookie,
}

#[derive(Clone)]
struct MockState {
    issue: Issue,
    revoked: Arc<AtomicBool>,
    saw_authorization: Arc<AtomicBool>,
}

/// A running mock backend.
pub struct MockBackend {
    addr: SocketAddr,
    revoked: Arc<AtomicBool>,
    saw_authorization: Arc<AtomicBool>,
}

impl MockBackend {
    /// Bind to an ephemeral loopback port and serve bearer sessions in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn spawn() -> std::io::Result<Self> {
        Self::spawn_issuing(Issue::Bearer).await
    }

    /// Same, choosing how the session is issued.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn spawn_issuing(issue: Issue) -> std::io::Result<Self> {
        let state = MockState {
            issue,
            revoked: Arc::new(AtomicBool::new(false)),
            saw_authorization: Arc::new(AtomicBool::new(false)),
        };
        let revoked = Arc::clone(&state.revoked);
        let saw_authorization = Arc::clone(&state.saw_authorization);

        let app = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/logout", post(logout))
            .route("/api/v1/auth/register", post(register))
            .route("/api/v1/auth/me", get(me))
            .route("/api/v1/posts", get(posts))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            revoked,
            saw_authorization,
        })
    }

    /// API base URL, e.g. `http://127.0.0.1:4321/api/v1`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Reject the issued token from now on.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Whether any request so far carried an `Authorization` header.
    #[must_use]
    pub fn saw_authorization(&self) -> bool {
        self.saw_authorization.load(Ordering::SeqCst)
    }
}

/// Serve a single API base whose every response is a 401 that promises a
/// longer body than it sends, then hangs up.
///
/// Returns the API base URL.
///
/// # Errors
///
/// Returns the bind error.
pub async fn spawn_truncated_unauthorized() -> std::io::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0_u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 401 Unauthorized\r\n\
                      Content-Type: application/json\r\n\
                      Content-Length: 512\r\n\r\n\
                      {\"success\":false",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });
    Ok(format!("http://{addr}/api/v1"))
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
        "message": null,
        "errorCode": null,
        "timestamp": "2026-01-01T00:00:00",
    }))
}

fn failure(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "data": null,
            "message": message,
            "errorCode": code,
            "timestamp": "2026-01-01T00:00:00",
        })),
    )
        .into_response()
}

fn user() -> Value {
    json!({
        "id": USER_ID,
        "email": EMAIL,
        "nickname": "neo",
        "profileImageUrl": null,
        "role": "USER",
    })
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let bearer = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if bearer.is_some() {
        state.saw_authorization.store(true, Ordering::SeqCst);
    }
    if state.revoked.load(Ordering::SeqCst) {
        return false;
    }

    let session_cookie = format!("accessToken={TOKEN}");
    match state.issue {
        Issue::Bearer => bearer.is_some_and(|v| v == format!("Bearer {TOKEN}")),
        Issue::Cookie => headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .any(|pair| pair.trim() == session_cookie),
    }
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL && body["password"] == PASSWORD {
        match state.issue {
            Issue::Bearer => envelope(json!({
                "accessToken": TOKEN,
                "refreshToken": null,
                "tokenType": "Bearer",
                "expiresIn": 3600,
                "user": user(),
            }))
            .into_response(),
            Issue::Cookie => (
                [(
                    SET_COOKIE,
                    format!("accessToken={TOKEN}; Path=/; HttpOnly; SameSite=Lax"),
                )],
                envelope(json!({
                    "accessToken": null,
                    "refreshToken": null,
                    "tokenType": "Bearer",
                    "expiresIn": 3600,
                    "user": user(),
                })),
            )
                .into_response(),
        }
    } else {
        failure(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password",
        )
    }
}

async fn logout() -> Response {
    (
        [(SET_COOKIE, "accessToken=; Path=/; Max-Age=0; HttpOnly")],
        envelope(Value::Null),
    )
        .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == EMAIL {
        return failure(StatusCode::CONFLICT, "DUPLICATE_EMAIL", "Email already in use");
    }
    envelope(json!({ "id": 6, "email": body["email"], "nickname": body["nickname"] }))
        .into_response()
}

async fn me(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if authorized(&state, &headers) {
        envelope(user()).into_response()
    } else {
        failure(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
    }
}

async fn posts(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if authorized(&state, &headers) {
        envelope(json!([{ "id": 1, "title": "hello" }])).into_response()
    } else {
        failure(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
    }
}
