//! Identity provider hook authentication.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::crypto::sha256_hex;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the shared hook secret.
pub const HOOK_SECRET_HEADER: &str = "X-Hook-Secret";

/// Proof that the request came from the identity provider.
#[derive(Debug, Clone, Copy)]
pub struct HookCaller;

impl HookCaller {
    /// Compares digests so the comparison does not depend on where the
    /// strings first differ.
    pub fn verify(expected: &str, provided: &str) -> bool {
        !expected.is_empty() && sha256_hex(expected) == sha256_hex(provided)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for HookCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(HOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if HookCaller::verify(&state.config.hooks.sign_in_secret, provided) {
            Ok(HookCaller)
        } else {
            tracing::warn!("Rejected hook call with invalid secret");
            Err(ApiError::Unauthorized("Invalid hook secret".to_string()))
        }
    }
}
