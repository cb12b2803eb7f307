//! Current user and organizer request handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::role::{CreateRoleRequestRequest, RoleStateResponse};
use domain::services::OrganizerRequestOutcome;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

async fn role_state_response(
    state: &AppState,
    auth: &UserAuth,
) -> Result<RoleStateResponse, ApiError> {
    let caller = auth.caller();
    let role_state = state.roles.role_state(&caller).await?;
    let admin = state.roles.is_admin(auth.user_id).await?;
    let request = state.roles.role_request(auth.user_id).await?;

    Ok(RoleStateResponse {
        user_id: auth.user_id,
        email: auth.email.clone(),
        state: role_state,
        admin,
        request,
    })
}

/// Get the caller's profile and role state.
///
/// GET /api/v1/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<RoleStateResponse>, ApiError> {
    Ok(Json(role_state_response(&state, &auth).await?))
}

/// Ask to become an organizer.
///
/// Opens a pending request unless one is already pending. A request for an
/// email on the auto-approve ledger is approved immediately.
///
/// POST /api/v1/role-requests
pub async fn create_role_request(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateRoleRequestRequest>,
) -> Result<(StatusCode, Json<RoleStateResponse>), ApiError> {
    request.validate()?;

    let outcome = state
        .roles
        .request_organizer(&auth.caller(), request.reason.as_deref())
        .await?;

    let status = match &outcome {
        OrganizerRequestOutcome::Pending(_) | OrganizerRequestOutcome::AutoApproved(_) => {
            StatusCode::CREATED
        }
        OrganizerRequestOutcome::AlreadyPending(_) | OrganizerRequestOutcome::AlreadyOrganizer => {
            StatusCode::OK
        }
    };

    let response = role_state_response(&state, &auth).await?;
    tracing::info!(
        user_id = %auth.user_id,
        state = ?response.state,
        auto_approved = matches!(outcome, OrganizerRequestOutcome::AutoApproved(_)),
        "Organizer request handled"
    );

    Ok((status, Json(response)))
}
