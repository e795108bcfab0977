//! Client error types.
//!
//! Call sites see one [`ClientError`]. Authentication rejection is reduced to
//! [`ClientError::Unauthorized`] after the session client has already
//! invalidated local state, so callers never have to clean up themselves.

use thiserror::Error;

use community_core::auth::RegistrationError;
use community_core::types::EmailError;

use crate::config::ConfigError;
use crate::runtime::StorageError;

/// Errors returned to callers of the session runtime.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status or envelope.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend supplied message.
        message: String,
    },

    /// The session credential was rejected. Local state is already cleared.
    #[error("Session is no longer valid")]
    Unauthorized,

    /// Input was rejected before being sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Message suitable for showing in the UI.
    ///
    /// Backend and validation messages are passed through; anything else
    /// falls back to `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<EmailError> for ClientError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RegistrationError> for ClientError {
    fn from(err: RegistrationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Errors delivering a message to the native shell.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The shell's message channel is gone.
    #[error("native shell channel closed")]
    Closed,

    /// The shell refused the message.
    #[error("native shell rejected message: {0}")]
    Rejected(String),

    /// The message could not be encoded.
    #[error(transparent)]
    Message(#[from] community_core::MessageError),
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = ClientError::Api {
            status: 400,
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.user_message("Registration failed."), "Email already registered");
    }

    #[test]
    fn test_user_message_falls_back() {
        let blank = ClientError::Api {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(blank.user_message("Login failed."), "Login failed.");
        assert_eq!(
            ClientError::Unauthorized.user_message("Login failed."),
            "Login failed."
        );
        assert_eq!(
            ClientError::Decode("eof".to_string()).user_message("Login failed."),
            "Login failed."
        );
    }

    #[test]
    fn test_validation_errors_convert() {
        let err: ClientError = EmailError::Empty.into();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(!err.user_message("x").is_empty());
    }
}
