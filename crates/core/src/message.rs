//! WebView bridge messages.
//!
//! Messages travel as JSON strings between the hosted page and the native
//! shell:
//!
//! ```json
//! {"type": "NAVIGATION", "payload": {"url": "/posts/1"}, "timestamp": 1718000000000}
//! ```
//!
//! Each `type` has exactly one payload shape. Payloads are checked against
//! their type when a message is decoded, so listeners only ever see
//! well-formed messages.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::device::DeviceInfo;

/// Errors decoding a raw bridge message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Not valid JSON, unknown type, or payload does not match its type.
    #[error("malformed bridge message: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON value is not an object.
    #[error("bridge message must be a JSON object")]
    NotAnObject,
    /// The `timestamp` field is missing or not an integer.
    #[error("bridge message timestamp missing or not an integer")]
    InvalidTimestamp,
}

/// The kinds of message the bridge carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// A session credential was established in the page.
    AuthLogin,
    /// The page signed out.
    AuthLogout,
    /// The page navigated.
    Navigation,
    /// Share sheet request.
    Share,
    /// Local notification request.
    Notification,
    /// Device classification report.
    DeviceInfo,
}

/// Share sheet request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    /// URL to share.
    pub url: String,
    /// Optional share title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional share text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Local notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title.
    pub title: String,
    /// Optional notification body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A bridge message, one payload shape per type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeMessage {
    /// Hand the session token to the shell.
    AuthLogin {
        /// Bearer token.
        token: String,
    },
    /// Tell the shell the session ended.
    AuthLogout {},
    /// Tell the shell the page moved.
    Navigation {
        /// Destination URL.
        url: String,
    },
    /// Ask the shell to open its share sheet.
    Share(SharePayload),
    /// Ask the shell to show a notification.
    Notification(NotificationPayload),
    /// Report the page's device classification.
    DeviceInfo(DeviceInfo),
}

impl BridgeMessage {
    /// The type tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::AuthLogin { .. } => MessageType::AuthLogin,
            Self::AuthLogout {} => MessageType::AuthLogout,
            Self::Navigation { .. } => MessageType::Navigation,
            Self::Share(_) => MessageType::Share,
            Self::Notification(_) => MessageType::Notification,
            Self::DeviceInfo(_) => MessageType::DeviceInfo,
        }
    }
}

/// A timestamped message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebViewMessage {
    /// The typed message.
    pub message: BridgeMessage,
    /// Send time in Unix epoch milliseconds.
    pub timestamp: i64,
}

impl WebViewMessage {
    /// Stamp a message with the current time.
    #[must_use]
    pub fn now(message: BridgeMessage) -> Self {
        Self {
            message,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Encode as the JSON string handed to the shell's `postMessage`.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        let mut value = match serde_json::to_value(&self.message)? {
            Value::Object(map) => map,
            _ => return Err(MessageError::NotAnObject),
        };
        value.insert("timestamp".to_owned(), Value::from(self.timestamp));
        Ok(serde_json::to_string(&Value::Object(value))?)
    }

    /// Decode and validate a raw inbound message.
    ///
    /// # Errors
    ///
    /// Returns `MessageError` if the input is not a well-formed message.
    pub fn from_json(raw: &str) -> Result<Self, MessageError> {
        let mut object: Map<String, Value> = match serde_json::from_str(raw)? {
            Value::Object(map) => map,
            _ => return Err(MessageError::NotAnObject),
        };

        let timestamp = object
            .remove("timestamp")
            .and_then(|t| t.as_i64())
            .ok_or(MessageError::InvalidTimestamp)?;

        let message = BridgeMessage::deserialize(Value::Object(object))?;
        Ok(Self { message, timestamp })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = WebViewMessage {
            message: BridgeMessage::AuthLogin {
                token: "abc".to_string(),
            },
            timestamp: 1_700_000_000_000,
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "AUTH_LOGIN");
        assert_eq!(value["payload"]["token"], "abc");
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_logout_payload_is_empty_object() {
        let json = WebViewMessage::now(BridgeMessage::AuthLogout {})
            .to_json()
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["payload"], serde_json::json!({}));
    }

    #[test]
    fn test_decodes_navigation() {
        let msg = WebViewMessage::from_json(
            r#"{"type":"NAVIGATION","payload":{"url":"/posts/3"},"timestamp":12}"#,
        )
        .unwrap();
        assert_eq!(msg.timestamp, 12);
        assert_eq!(msg.message.message_type(), MessageType::Navigation);
        assert_eq!(
            msg.message,
            BridgeMessage::Navigation {
                url: "/posts/3".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_payload_of_wrong_shape() {
        let err = WebViewMessage::from_json(
            r#"{"type":"NAVIGATION","payload":{"token":"x"},"timestamp":1}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MessageError::Json(_)));
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err =
            WebViewMessage::from_json(r#"{"type":"SELF_DESTRUCT","payload":{},"timestamp":1}"#)
                .unwrap_err();
        assert!(matches!(err, MessageError::Json(_)));
    }

    #[test]
    fn test_rejects_non_objects_and_missing_timestamp() {
        assert!(matches!(
            WebViewMessage::from_json("[1,2]"),
            Err(MessageError::NotAnObject)
        ));
        assert!(matches!(
            WebViewMessage::from_json(r#"{"type":"AUTH_LOGOUT","payload":{}}"#),
            Err(MessageError::InvalidTimestamp)
        ));
        assert!(matches!(
            WebViewMessage::from_json("not json"),
            Err(MessageError::Json(_))
        ));
    }

    #[test]
    fn test_device_info_payload() {
        let info = DeviceInfo::classify(Some("iPhone"), true);
        let msg = WebViewMessage::now(BridgeMessage::DeviceInfo(info.clone()));
        let decoded = WebViewMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(decoded.message, BridgeMessage::DeviceInfo(info));
    }
}
