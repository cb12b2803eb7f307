//! Audience records: push subscriptions, registrations and saved events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A device token subscribed to push updates for one event.
///
/// Keyed by `(event_id, token)`; the same token subscribing twice overwrites
/// the previous record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub event_id: Uuid,
    pub token: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub subscribed_at: DateTime<Utc>,
}

/// A user registered (RSVP) for one event. Keyed by `(event_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// Denormalized copy of an event in a user's personal list.
///
/// Not used for targeting. Its summary fields are refreshed when the event's
/// time or location change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedEvent {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Request payload for subscribing a device to an event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[validate(length(min = 1, max = 4096, message = "Token must be 1-4096 characters"))]
    pub token: String,
}

/// Request payload for registering to an event.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: Option<String>,
}

/// Response payload for a registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        Self {
            event_id: r.event_id,
            user_id: r.user_id,
            email: r.email,
            name: r.name,
            registered_at: r.registered_at,
        }
    }
}

/// Response for listing an event's registrations (organizer view).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRegistrationsResponse {
    pub registrations: Vec<RegistrationResponse>,
    pub total: usize,
}

/// Response for listing a user's saved events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSavedEventsResponse {
    pub events: Vec<SavedEvent>,
    pub total: usize,
}
