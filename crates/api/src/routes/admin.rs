//! Admin endpoints.
//!
//! Every handler checks the caller's stored admin claim. Requests without a
//! valid session are rejected as unauthenticated, not forbidden.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::event::EventResponse;
use domain::models::role::{
    ListRoleRequestsQuery, ListRoleRequestsResponse, OrganizerApprovalRequest,
    OrganizerApprovalResponse,
};
use domain::models::EventStatus;
use domain::services::OrganizerApproval;
use persistence::repositories::{EventRepository, RoleRepository};
use shared::pagination::PageInfo;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalUserAuth;
use crate::routes::events::load_event;

/// Grant or revoke organizer status for an email.
///
/// With `auto` set, the email is also added to (or removed from) the
/// auto-approve list. An existing account's claim is rewritten at once.
///
/// POST /api/v1/admin/organizer-approvals
pub async fn set_organizer_approval(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Json(request): Json<OrganizerApprovalRequest>,
) -> Result<Json<OrganizerApprovalResponse>, ApiError> {
    let caller = auth.caller();
    state.roles.require_admin(caller.as_ref()).await?;
    request.validate()?;

    let outcome = state
        .roles
        .set_organizer_approval(
            caller.as_ref(),
            OrganizerApproval {
                email: request.email,
                approve: request.approve,
                auto: request.auto,
            },
        )
        .await?;

    Ok(Json(OrganizerApprovalResponse {
        email: outcome.email,
        approve: outcome.approve,
        auto: outcome.auto,
        claim_refreshed: outcome.refreshed_user.is_some(),
    }))
}

/// Take any event down.
///
/// POST /api/v1/admin/events/:event_id/unpublish
pub async fn unpublish_event(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let caller = auth.caller();
    let admin = state.roles.require_admin(caller.as_ref()).await?;

    load_event(&state, event_id).await?;
    let event = EventRepository::new(state.pool.clone())
        .set_status(event_id, EventStatus::Unpublished)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    info!(event_id = %event_id, admin_id = %admin.user_id, "Event unpublished by admin");
    Ok(Json(event.into()))
}

/// The organizer request queue.
///
/// GET /api/v1/admin/role-requests?status=pending
pub async fn list_role_requests(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Query(query): Query<ListRoleRequestsQuery>,
) -> Result<Json<ListRoleRequestsResponse>, ApiError> {
    state.roles.require_admin(auth.caller().as_ref()).await?;

    let page = query.page_request();
    let (requests, total) = RoleRepository::new(state.pool.clone())
        .list_requests(query.status, page.limit(), page.offset())
        .await?;

    Ok(Json(ListRoleRequestsResponse {
        requests,
        pagination: PageInfo::new(page, total),
    }))
}
