//! Push subscription, registration, and saved event handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::audience::{
    ListSavedEventsResponse, RegisterRequest, RegistrationResponse, SubscribeRequest,
};
use domain::models::{Event, PushSubscription, SavedEvent};
use persistence::repositories::{AudienceRepository, RegisterOutcome, SavedEventRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::events::load_event;

/// Audience writes only target published events.
async fn load_published(state: &AppState, event_id: Uuid) -> Result<Event, ApiError> {
    let event = load_event(state, event_id).await?;
    if !event.is_published() {
        return Err(ApiError::NotFound("Event not found".to_string()));
    }
    Ok(event)
}

/// Subscribe a device to change notifications for an event.
///
/// POST /api/v1/events/:event_id/subscriptions
pub async fn subscribe(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<PushSubscription>), ApiError> {
    request.validate()?;
    load_published(&state, event_id).await?;

    let subscription = AudienceRepository::new(state.pool.clone())
        .upsert_subscription(
            event_id,
            request.token.trim(),
            Some(auth.user_id),
            Some(&auth.email),
        )
        .await?;

    info!(event_id = %event_id, user_id = %auth.user_id, "Push subscription stored");
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Remove one of the caller's device subscriptions.
///
/// DELETE /api/v1/events/:event_id/subscriptions/:token
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: UserAuth,
    Path((event_id, token)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let removed = AudienceRepository::new(state.pool.clone())
        .delete_own_subscription(event_id, &token, auth.user_id)
        .await?;
    if !removed {
        return Err(ApiError::NotFound("Subscription not found".to_string()));
    }

    info!(event_id = %event_id, user_id = %auth.user_id, "Push subscription removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Register the caller for an event. Registering twice keeps one record.
///
/// PUT /api/v1/events/:event_id/registration
pub async fn register(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    request.validate()?;
    load_published(&state, event_id).await?;

    let outcome = AudienceRepository::new(state.pool.clone())
        .register(
            event_id,
            auth.user_id,
            Some(&auth.email),
            request.name.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    match outcome {
        RegisterOutcome::Registered(registration) => {
            info!(event_id = %event_id, user_id = %auth.user_id, "Registered for event");
            Ok(Json(registration.into()))
        }
        RegisterOutcome::Full => Err(ApiError::Conflict("Event is full".to_string())),
    }
}

/// Cancel the caller's registration.
///
/// DELETE /api/v1/events/:event_id/registration
pub async fn unregister(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = AudienceRepository::new(state.pool.clone())
        .unregister(event_id, auth.user_id)
        .await?;
    if !removed {
        return Err(ApiError::NotFound("Registration not found".to_string()));
    }

    info!(event_id = %event_id, user_id = %auth.user_id, "Registration cancelled");
    Ok(StatusCode::NO_CONTENT)
}

/// Save an event to the caller's list.
///
/// PUT /api/v1/events/:event_id/saved
pub async fn save(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<SavedEvent>, ApiError> {
    let event = load_published(&state, event_id).await?;
    let saved = SavedEventRepository::new(state.pool.clone())
        .save(auth.user_id, &event)
        .await?;
    Ok(Json(saved))
}

/// Remove an event from the caller's list.
///
/// DELETE /api/v1/events/:event_id/saved
pub async fn unsave(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = SavedEventRepository::new(state.pool.clone())
        .unsave(auth.user_id, event_id)
        .await?;
    if !removed {
        return Err(ApiError::NotFound("Saved event not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's saved events.
///
/// GET /api/v1/me/saved
pub async fn list_saved(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<ListSavedEventsResponse>, ApiError> {
    let events = SavedEventRepository::new(state.pool.clone())
        .list_for_user(auth.user_id)
        .await?;
    let total = events.len();
    Ok(Json(ListSavedEventsResponse { events, total }))
}
