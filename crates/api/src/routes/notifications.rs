//! Notification feed handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::notification::ListNotificationsResponse;
use persistence::repositories::NotificationRepository;
use shared::pagination::{PageInfo, PageRequest};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// List the caller's feed, newest first.
///
/// GET /api/v1/notifications?page=1&per_page=20
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(page): Query<PageRequest>,
) -> Result<Json<ListNotificationsResponse>, ApiError> {
    let page = page.normalized();
    let repo = NotificationRepository::new(state.pool.clone());

    let notifications = repo
        .list_for_user(auth.user_id, page.limit(), page.offset())
        .await?;
    let (total, unread) = repo.counts_for_user(auth.user_id).await?;

    Ok(Json(ListNotificationsResponse {
        notifications,
        unread,
        pagination: PageInfo::new(page, total),
    }))
}

/// Mark one of the caller's feed items as read.
///
/// POST /api/v1/notifications/:notification_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_read(auth.user_id, notification_id)
        .await?;
    if !updated {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    tracing::debug!(user_id = %auth.user_id, notification_id = %notification_id, "Notification read");
    Ok(StatusCode::NO_CONTENT)
}
