//! Event endpoint handlers.
//!
//! Writes require the organizer role, re-derived from the ledger on every
//! call, and ownership of the event. Admins may act on any event.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::event::{
    CreateEventRequest, EventResponse, ListEventsQuery, ListEventsResponse, MyEventsQuery,
    UpdateEventRequest,
};
use domain::models::audience::{ListRegistrationsResponse, RegistrationResponse};
use domain::models::{Event, EventStatus};
use persistence::repositories::{
    AudienceRepository, EventRepository, EventUpdate, PublishedEventsQuery,
};
use shared::pagination::PageInfo;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::RequestId;
use crate::triggers;

/// Loads an event or fails with 404.
pub(crate) async fn load_event(state: &AppState, event_id: Uuid) -> Result<Event, ApiError> {
    EventRepository::new(state.pool.clone())
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
}

/// Admins may manage any event; otherwise the caller must own it and still
/// hold the organizer role.
pub(crate) async fn authorize_manage(
    state: &AppState,
    auth: &UserAuth,
    event: &Event,
) -> Result<(), ApiError> {
    if state.roles.is_admin(auth.user_id).await? {
        return Ok(());
    }
    if event.organizer_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "Only the event's organizer can manage it".to_string(),
        ));
    }
    state.roles.require_organizer(&auth.caller()).await?;
    Ok(())
}

/// Students only see published events. Hidden events read as missing.
async fn authorize_view(state: &AppState, auth: &UserAuth, event: &Event) -> Result<(), ApiError> {
    if event.is_published() || event.organizer_id == auth.user_id {
        return Ok(());
    }
    if state.roles.is_admin(auth.user_id).await? {
        return Ok(());
    }
    Err(ApiError::NotFound("Event not found".to_string()))
}

/// Published events must have a valid time window.
fn require_publishable(event: &Event) -> Result<(), ApiError> {
    match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => {
            shared::validation::validate_event_window(start, end)?;
            Ok(())
        }
        _ => Err(ApiError::Validation(
            "Start and end time are required to publish".to_string(),
        )),
    }
}

/// List published events, soonest first.
///
/// GET /api/v1/events
pub async fn list_events(
    State(state): State<AppState>,
    _auth: UserAuth,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let page = query.page_request();
    let (events, total) = EventRepository::new(state.pool.clone())
        .list_published(&PublishedEventsQuery {
            category: query.category.clone(),
            from: query.from,
            limit: page.limit(),
            offset: page.offset(),
        })
        .await?;

    Ok(Json(ListEventsResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
        pagination: PageInfo::new(page, total),
    }))
}

/// Get a single event.
///
/// GET /api/v1/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let event = load_event(&state, event_id).await?;
    authorize_view(&state, &auth, &event).await?;
    Ok(Json(event.into()))
}

/// Create an event as a draft, or published when `publish` is set.
///
/// POST /api/v1/events
pub async fn create_event(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    request.validate()?;
    request.validate_window()?;
    state.roles.require_organizer(&auth.caller()).await?;

    let event = EventRepository::new(state.pool.clone())
        .create(auth.user_id, &request)
        .await?;

    info!(
        event_id = %event.id,
        organizer_id = %auth.user_id,
        status = %event.status,
        "Event created"
    );

    Ok((StatusCode::CREATED, Json(event.into())))
}

/// Update an event. A changed time or location on a published event
/// notifies its audience after the response is sent.
///
/// PATCH /api/v1/events/:event_id
pub async fn update_event(
    State(state): State<AppState>,
    auth: UserAuth,
    request_id: Option<Extension<RequestId>>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    request.validate()?;

    let current = load_event(&state, event_id).await?;
    authorize_manage(&state, &auth, &current).await?;
    request.validate_window_for(&current)?;

    let (before, after) = match EventRepository::new(state.pool.clone())
        .update(event_id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?
    {
        EventUpdate::Updated { before, after } => (before, after),
        EventUpdate::InvalidWindow(e) => return Err(e.into()),
    };

    info!(event_id = %event_id, user_id = %auth.user_id, "Event updated");

    let request_id = request_id.map(|Extension(RequestId(id))| id).unwrap_or_default();
    triggers::spawn_event_updated(&state, before, after.clone(), request_id);

    Ok(Json(after.into()))
}

async fn set_status(
    state: &AppState,
    auth: &UserAuth,
    event_id: Uuid,
    status: EventStatus,
) -> Result<Event, ApiError> {
    let event = load_event(state, event_id).await?;
    authorize_manage(state, auth, &event).await?;
    if status == EventStatus::Published {
        require_publishable(&event)?;
    }

    let updated = EventRepository::new(state.pool.clone())
        .set_status(event_id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    info!(
        event_id = %event_id,
        user_id = %auth.user_id,
        status = %status,
        "Event status changed"
    );
    Ok(updated)
}

/// Publish a draft or unpublished event.
///
/// POST /api/v1/events/:event_id/publish
pub async fn publish_event(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let event = set_status(&state, &auth, event_id, EventStatus::Published).await?;
    Ok(Json(event.into()))
}

/// Unpublish an event. The row is kept.
///
/// POST /api/v1/events/:event_id/unpublish
pub async fn unpublish_event(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let event = set_status(&state, &auth, event_id, EventStatus::Unpublished).await?;
    Ok(Json(event.into()))
}

/// List the caller's own events.
///
/// GET /api/v1/me/events?status=draft
pub async fn list_my_events(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<MyEventsQuery>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    state.roles.require_organizer(&auth.caller()).await?;

    let events = EventRepository::new(state.pool.clone())
        .list_by_organizer(auth.user_id, query.status)
        .await?;

    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// List an event's registrations.
///
/// GET /api/v1/events/:event_id/registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ListRegistrationsResponse>, ApiError> {
    let event = load_event(&state, event_id).await?;
    authorize_manage(&state, &auth, &event).await?;

    let registrations: Vec<RegistrationResponse> = AudienceRepository::new(state.pool.clone())
        .list_registrations_for_event(event_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let total = registrations.len();

    Ok(Json(ListRegistrationsResponse {
        registrations,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::test_support::{json_body, TestApp};

    fn draft() -> Event {
        let start = Utc.with_ymd_and_hms(2025, 9, 12, 17, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Activities Fair".to_string(),
            description: None,
            category: None,
            organization: None,
            contact_email: None,
            start_time: Some(start),
            end_time: None,
            location_name: None,
            latitude: None,
            longitude: None,
            max_attendees: None,
            rsvp_required: false,
            status: EventStatus::Draft,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_publish_requires_complete_window() {
        let event = draft();
        assert!(matches!(
            require_publishable(&event),
            Err(ApiError::Validation(_))
        ));

        let backwards = Event {
            end_time: event.start_time.map(|s| s - chrono::Duration::hours(1)),
            ..event.clone()
        };
        assert!(require_publishable(&backwards).is_err());

        let valid = Event {
            end_time: event.start_time.map(|s| s + chrono::Duration::hours(2)),
            ..event
        };
        assert!(require_publishable(&valid).is_ok());
    }

    #[tokio::test]
    async fn test_students_cannot_create_events() {
        let app = TestApp::new();
        let (_, token) = app.user("student@depauw.edu").await;

        let response = app
            .send(
                Method::POST,
                "/api/v1/events",
                Some(&token),
                Some(json!({
                    "title": "Study Break",
                    "startTime": "2025-09-12T17:00:00Z",
                    "endTime": "2025-09-12T18:00:00Z"
                })),
            )
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_inverted_window_rejected_before_role_check() {
        let app = TestApp::new();
        let (_, token) = app.user("student@depauw.edu").await;

        let response = app
            .send(
                Method::POST,
                "/api/v1/events",
                Some(&token),
                Some(json!({
                    "title": "Study Break",
                    "startTime": "2025-09-12T18:00:00Z",
                    "endTime": "2025-09-12T17:00:00Z"
                })),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
