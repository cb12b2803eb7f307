//! User profile and identity-provider claim models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::role::Role;

/// A signed-in user as known to this backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: DateTime<Utc>,
}

/// Claims stored by the identity provider for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub user_id: Uuid,
    pub role: Role,
    pub admin: bool,
    pub updated_at: DateTime<Utc>,
}

/// Payload delivered by the identity provider's before-sign-in hook.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInHookRequest {
    pub user_id: Uuid,

    #[validate(email(message = "Email must be a valid email"))]
    pub email: String,

    #[validate(length(max = 200, message = "Display name must be at most 200 characters"))]
    pub display_name: Option<String>,
}

/// Response to the sign-in hook: the claims to stamp and a session token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInHookResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub admin: bool,
    pub session_token: String,
    pub expires_in: i64,
}
