//! Event entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Event, EventStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for event publication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatusDb {
    Draft,
    Published,
    Unpublished,
}

impl From<EventStatusDb> for EventStatus {
    fn from(db: EventStatusDb) -> Self {
        match db {
            EventStatusDb::Draft => EventStatus::Draft,
            EventStatusDb::Published => EventStatus::Published,
            EventStatusDb::Unpublished => EventStatus::Unpublished,
        }
    }
}

impl From<EventStatus> for EventStatusDb {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Draft => EventStatusDb::Draft,
            EventStatus::Published => EventStatusDb::Published,
            EventStatus::Unpublished => EventStatusDb::Unpublished,
        }
    }
}

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_attendees: Option<i32>,
    pub rsvp_required: bool,
    pub status: EventStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventEntity> for Event {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            organizer_id: entity.organizer_id,
            title: entity.title,
            description: entity.description,
            category: entity.category,
            organization: entity.organization,
            contact_email: entity.contact_email,
            start_time: entity.start_time,
            end_time: entity.end_time,
            location_name: entity.location_name,
            latitude: entity.latitude,
            longitude: entity.longitude,
            max_attendees: entity.max_attendees,
            rsvp_required: entity.rsvp_required,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_entity_to_domain() {
        let now = Utc::now();
        let entity = EventEntity {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Trivia Night".to_string(),
            description: None,
            category: Some("social".to_string()),
            organization: Some("Student Union".to_string()),
            contact_email: None,
            start_time: Some(now),
            end_time: Some(now + chrono::Duration::hours(2)),
            location_name: Some("Hub".to_string()),
            latitude: None,
            longitude: None,
            max_attendees: Some(80),
            rsvp_required: true,
            status: EventStatusDb::Published,
            created_at: now,
            updated_at: now,
        };

        let event: Event = entity.clone().into();
        assert_eq!(event.id, entity.id);
        assert_eq!(event.status, EventStatus::Published);
        assert_eq!(event.max_attendees, Some(80));
        assert!(event.rsvp_required);
    }

    #[test]
    fn test_status_conversion_roundtrip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::Unpublished,
        ] {
            let db: EventStatusDb = status.into();
            assert_eq!(EventStatus::from(db), status);
        }
    }
}
