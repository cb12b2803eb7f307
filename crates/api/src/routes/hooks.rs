//! Identity provider hook handlers.

use axum::{extract::State, Json};
use domain::models::user::{SignInHookRequest, SignInHookResponse};
use persistence::repositories::UserRepository;
use shared::jwt::SessionSubject;
use shared::validation::normalize_email;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::HookCaller;
use crate::middleware::metrics::record_role_resolution;

/// Resolve the role of a user about to sign in and issue a session.
///
/// The role is re-derived from the ledger on every sign-in; the claim written
/// here is what the session token carries.
///
/// POST /api/v1/hooks/sign-in
pub async fn sign_in(
    _hook: HookCaller,
    State(state): State<AppState>,
    Json(request): Json<SignInHookRequest>,
) -> Result<Json<SignInHookResponse>, ApiError> {
    request.validate()?;

    let email = normalize_email(&request.email);

    UserRepository::new(state.pool.clone())
        .upsert_on_sign_in(request.user_id, &email, request.display_name.as_deref())
        .await?;

    let resolution = state
        .roles
        .resolve_on_sign_in(request.user_id, &email)
        .await?;
    record_role_resolution(resolution.role.as_str());

    let (session_token, jti) = state
        .jwt
        .issue_session_token(&SessionSubject {
            user_id: request.user_id,
            email: &email,
            role: resolution.role.as_str(),
            admin: resolution.admin,
        })
        .map_err(|e| ApiError::Internal(format!("Failed to issue session token: {}", e)))?;

    info!(
        user_id = %request.user_id,
        role = %resolution.role,
        admin = resolution.admin,
        jti = %jti,
        "Session issued"
    );

    Ok(Json(SignInHookResponse {
        user_id: request.user_id,
        role: resolution.role,
        admin: resolution.admin,
        session_token,
        expires_in: state.jwt.access_token_expiry_secs,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, Request, StatusCode};
    use axum::body::Body;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::extractors::HOOK_SECRET_HEADER;
    use crate::test_support::{json_body, TestApp};

    fn hook_request(secret: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/hooks/sign-in")
            .header(HOOK_SECRET_HEADER, secret)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let app = TestApp::new();
        let email: String = SafeEmail().fake();
        let response = app
            .router()
            .oneshot(hook_request(
                "not-the-hook-secret",
                json!({ "userId": Uuid::new_v4(), "email": email }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(app.store.claims(Uuid::nil()).is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_any_write() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let response = app
            .router()
            .oneshot(hook_request(
                "test-hook-secret",
                json!({ "userId": user_id, "email": "not-an-email" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "validation_error");
        assert!(app.store.claims(user_id).is_none());
    }
}
