//! Campus event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::services::change_detection::EventSnapshot;

/// Publication state of an event.
///
/// Only published events are visible to students and only published events
/// fan out change notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Unpublished,
}

impl EventStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Unpublished => "unpublished",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "unpublished" => Some(EventStatus::Unpublished),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A campus event owned by an organizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
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
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Fields watched by change detection.
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            start_time: self.start_time,
            end_time: self.end_time,
            location_name: self.location_name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }
}

/// Request payload for creating an event. Saved as a draft unless `publish` is set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 64, message = "Category must be at most 64 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 200, message = "Organization must be at most 200 characters"))]
    pub organization: Option<String>,

    #[validate(email(message = "Contact email must be a valid email"))]
    pub contact_email: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(range(min = 1, max = 100000, message = "Max attendees must be between 1 and 100000"))]
    pub max_attendees: Option<i32>,

    #[serde(default)]
    pub rsvp_required: bool,

    /// Publish immediately instead of saving a draft.
    #[serde(default)]
    pub publish: bool,
}

impl CreateEventRequest {
    /// Cross-field checks the derive cannot express.
    pub fn validate_window(&self) -> Result<(), ValidationError> {
        shared::validation::validate_event_window(self.start_time, self.end_time)
    }
}

/// Request payload for updating an event (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 64, message = "Category must be at most 64 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 200, message = "Organization must be at most 200 characters"))]
    pub organization: Option<String>,

    #[validate(email(message = "Contact email must be a valid email"))]
    pub contact_email: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(range(min = 1, max = 100000, message = "Max attendees must be between 1 and 100000"))]
    pub max_attendees: Option<i32>,

    pub rsvp_required: Option<bool>,
}

impl UpdateEventRequest {
    /// Applies the patch to `event`, returning the updated copy.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut next = event.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            next.category = Some(category.clone());
        }
        if let Some(organization) = &self.organization {
            next.organization = Some(organization.clone());
        }
        if let Some(contact_email) = &self.contact_email {
            next.contact_email = Some(contact_email.clone());
        }
        if let Some(start_time) = self.start_time {
            next.start_time = Some(start_time);
        }
        if let Some(end_time) = self.end_time {
            next.end_time = Some(end_time);
        }
        if let Some(location_name) = &self.location_name {
            next.location_name = Some(location_name.clone());
        }
        if let Some(latitude) = self.latitude {
            next.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            next.longitude = Some(longitude);
        }
        if let Some(max_attendees) = self.max_attendees {
            next.max_attendees = Some(max_attendees);
        }
        if let Some(rsvp_required) = self.rsvp_required {
            next.rsvp_required = rsvp_required;
        }
        next
    }

    /// Validates the resulting start/end window after the patch is applied.
    pub fn validate_window_for(&self, event: &Event) -> Result<(), ValidationError> {
        let start = self.start_time.or(event.start_time);
        let end = self.end_time.or(event.end_time);
        match (start, end) {
            (Some(start), Some(end)) => shared::validation::validate_event_window(start, end),
            _ => Ok(()),
        }
    }
}

/// Response payload for event operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<i32>,
    pub rsvp_required: bool,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            organizer_id: e.organizer_id,
            title: e.title,
            description: e.description,
            category: e.category,
            organization: e.organization,
            contact_email: e.contact_email,
            start_time: e.start_time,
            end_time: e.end_time,
            location_name: e.location_name,
            latitude: e.latitude,
            longitude: e.longitude,
            max_attendees: e.max_attendees,
            rsvp_required: e.rsvp_required,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Response for listing events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResponse {
    pub events: Vec<EventResponse>,
    pub pagination: shared::pagination::PageInfo,
}

/// Query parameters for listing published events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    pub category: Option<String>,
    /// Only events starting at or after this instant.
    pub from: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    shared::pagination::DEFAULT_PER_PAGE
}

/// Query parameters for an organizer's own events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MyEventsQuery {
    pub status: Option<EventStatus>,
}

impl ListEventsQuery {
    pub fn page_request(&self) -> shared::pagination::PageRequest {
        shared::pagination::PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 18, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Spring Concert".to_string(),
            description: None,
            category: Some("music".to_string()),
            organization: None,
            contact_email: None,
            start_time: Some(start),
            end_time: Some(start + chrono::Duration::hours(2)),
            location_name: Some("Kresge Auditorium".to_string()),
            latitude: Some(39.64),
            longitude: Some(-86.86),
            max_attendees: None,
            rsvp_required: false,
            status: EventStatus::Published,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_event_status_roundtrip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::Unpublished,
        ] {
            assert_eq!(EventStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(EventStatus::from_str("archived"), None);
    }

    #[test]
    fn test_event_status_serialization() {
        let json = serde_json::to_string(&EventStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
    }

    #[test]
    fn test_snapshot_copies_watched_fields() {
        let e = event();
        let snap = e.snapshot();
        assert_eq!(snap.start_time, e.start_time);
        assert_eq!(snap.location_name.as_deref(), Some("Kresge Auditorium"));
        assert_eq!(snap.latitude, Some(39.64));
    }

    #[test]
    fn test_apply_partial_update() {
        let e = event();
        let patch = UpdateEventRequest {
            location_name: Some("Green Center".to_string()),
            ..Default::default()
        };
        let next = patch.apply_to(&e);
        assert_eq!(next.location_name.as_deref(), Some("Green Center"));
        assert_eq!(next.title, e.title);
        assert_eq!(next.start_time, e.start_time);
    }

    #[test]
    fn test_update_window_validation_uses_existing_fields() {
        let e = event();
        let patch = UpdateEventRequest {
            end_time: e.start_time.map(|s| s - chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(patch.validate_window_for(&e).is_err());

        let ok = UpdateEventRequest {
            end_time: e.start_time.map(|s| s + chrono::Duration::hours(3)),
            ..Default::default()
        };
        assert!(ok.validate_window_for(&e).is_ok());
    }

    #[test]
    fn test_create_request_validation() {
        let start = Utc.with_ymd_and_hms(2025, 4, 10, 18, 0, 0).unwrap();
        let request = CreateEventRequest {
            title: String::new(),
            description: None,
            category: None,
            organization: None,
            contact_email: Some("not-an-email".to_string()),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            location_name: None,
            latitude: Some(91.0),
            longitude: None,
            max_attendees: Some(0),
            rsvp_required: false,
            publish: false,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("contact_email"));
        assert!(fields.contains_key("latitude"));
        assert!(fields.contains_key("max_attendees"));
        assert!(request.validate_window().is_ok());
    }
}
