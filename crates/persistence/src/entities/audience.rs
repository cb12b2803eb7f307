//! Audience entities: push subscriptions, registrations, saved events.

use chrono::{DateTime, Utc};
use domain::models::{PushSubscription, Registration, SavedEvent};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the push_subscriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct PushSubscriptionEntity {
    pub event_id: Uuid,
    pub token: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub subscribed_at: DateTime<Utc>,
}

impl From<PushSubscriptionEntity> for PushSubscription {
    fn from(entity: PushSubscriptionEntity) -> Self {
        Self {
            event_id: entity.event_id,
            token: entity.token,
            user_id: entity.user_id,
            email: entity.email,
            subscribed_at: entity.subscribed_at,
        }
    }
}

/// Database row mapping for the event_registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for Registration {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            event_id: entity.event_id,
            user_id: entity.user_id,
            email: entity.email,
            name: entity.name,
            registered_at: entity.registered_at,
        }
    }
}

/// Database row mapping for the saved_events table.
#[derive(Debug, Clone, FromRow)]
pub struct SavedEventEntity {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl From<SavedEventEntity> for SavedEvent {
    fn from(entity: SavedEventEntity) -> Self {
        Self {
            user_id: entity.user_id,
            event_id: entity.event_id,
            title: entity.title,
            start_time: entity.start_time,
            end_time: entity.end_time,
            location_name: entity.location_name,
            saved_at: entity.saved_at,
        }
    }
}
