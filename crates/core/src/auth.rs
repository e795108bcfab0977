//! Backend auth request and response shapes.
//!
//! Every backend response is wrapped in [`ApiEnvelope`]. Credentials never
//! appear in `Debug` output.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Email, EmailError, Nickname, NicknameError, UserSummary};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length accepted at registration.
pub const MAX_PASSWORD_LENGTH: usize = 20;

/// Special characters a registration password must draw from.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Errors validating a registration request before it is sent.
#[derive(Debug, Error, Clone)]
pub enum RegistrationError {
    /// Email is malformed.
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),
    /// Nickname is malformed.
    #[error("invalid nickname: {0}")]
    Nickname(#[from] NicknameError),
    /// Password does not meet the policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),
}

/// Standard backend response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    /// Whether the call succeeded.
    #[serde(default)]
    pub success: bool,
    /// Payload on success.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Human readable message (success or failure).
    #[serde(default)]
    pub message: Option<String>,
    /// Machine readable error code on failure.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Server time of the response, in whatever shape the backend emits.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

/// `POST /auth/login` body.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: Email,
    /// Plain password, sent once over TLS.
    pub password: String,
}

impl LoginRequest {
    /// Build a login request, validating the email shape.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the email is malformed.
    pub fn new(email: &str, password: impl Into<String>) -> Result<Self, EmailError> {
        Ok(Self {
            email: Email::parse(email)?,
            password: password.into(),
        })
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `POST /auth/register` body.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    /// Account email.
    pub email: Email,
    /// Plain password.
    pub password: String,
    /// Public nickname.
    pub nickname: Nickname,
}

impl RegisterRequest {
    /// Build and validate a registration request.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError` if any field fails validation.
    pub fn new(email: &str, password: &str, nickname: &str) -> Result<Self, RegistrationError> {
        let email = Email::parse(email)?;
        let nickname = Nickname::parse(nickname)?;
        validate_password(password)?;
        Ok(Self {
            email,
            password: password.to_owned(),
            nickname,
        })
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("nickname", &self.nickname)
            .finish()
    }
}

/// Validate a registration password.
///
/// 8-20 characters, at least one lowercase letter, one uppercase letter, one
/// digit and one of `@$!%*?&`, and nothing else.
///
/// # Errors
///
/// Returns `RegistrationError::WeakPassword` describing the first rule broken.
pub fn validate_password(password: &str) -> Result<(), RegistrationError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(RegistrationError::WeakPassword(format!(
            "must be {MIN_PASSWORD_LENGTH}-{MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if let Some(bad) = password
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !PASSWORD_SPECIALS.contains(*c))
    {
        return Err(RegistrationError::WeakPassword(format!(
            "character {bad:?} is not allowed"
        )));
    }

    let checks = [
        (password.chars().any(|c| c.is_ascii_lowercase()), "a lowercase letter"),
        (password.chars().any(|c| c.is_ascii_uppercase()), "an uppercase letter"),
        (password.chars().any(|c| c.is_ascii_digit()), "a digit"),
        (
            password.chars().any(|c| PASSWORD_SPECIALS.contains(c)),
            "one of @$!%*?&",
        ),
    ];
    if let Some((_, missing)) = checks.iter().find(|(ok, _)| !ok) {
        return Err(RegistrationError::WeakPassword(format!("must contain {missing}")));
    }

    Ok(())
}

/// Successful login payload.
///
/// In cookie deployments the backend leaves the token fields empty and sets
/// HTTP-only cookies instead.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Bearer token, when returned in the body.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token, when returned in the body.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// The signed-in user.
    pub user: UserSummary,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthResponse")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}
