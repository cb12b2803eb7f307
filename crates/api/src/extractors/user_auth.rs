//! Session token authentication extractors.
//!
//! The role carried in the token is informational only. Privileged handlers
//! re-derive organizer status from the ledger and admin status from stored
//! claims through [`domain::services::RoleAuthority`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::services::Caller;
use shared::jwt::{extract_user_id, JwtConfig, JwtError};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user from a Bearer session token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    /// Verified, lower-cased email.
    pub email: String,
    /// Role at the time the session was issued.
    pub session_role: String,
    /// JWT ID (jti) for session tracking.
    pub jti: String,
}

impl UserAuth {
    /// Validates a session token and returns the authenticated user.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt.validate_token(token)?;
        let user_id = extract_user_id(&claims)?;

        Ok(UserAuth {
            user_id,
            email: claims.email,
            session_role: claims.role,
            jti: claims.jti,
        })
    }

    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.user_id,
            email: self.email.clone(),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;

        UserAuth::validate(&state.jwt, token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })
    }
}

/// Optional session authentication.
///
/// Never rejects; a missing or invalid token yields `None`.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

impl OptionalUserAuth {
    pub fn caller(&self) -> Option<Caller> {
        self.0.as_ref().map(UserAuth::caller)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = bearer_token(parts).and_then(|token| UserAuth::validate(&state.jwt, token).ok());
        Ok(OptionalUserAuth(auth))
    }
}
