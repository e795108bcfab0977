//! User summary as returned by the backend auth endpoints.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// The signed-in user as the client knows it.
///
/// This is the only user data kept in client state and in the persisted
/// auth blob. It never includes the session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Backend user id.
    pub id: UserId,
    /// Account email, when the endpoint includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Public nickname.
    pub nickname: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Role name (`USER`, `MODERATOR`, `ADMIN`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
