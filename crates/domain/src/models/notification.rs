//! In-app feed notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind tag carried by feed notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EventUpdate,
}

impl NotificationKind {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EventUpdate => "event_update",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "event_update" => Some(NotificationKind::EventUpdate),
            _ => None,
        }
    }
}

/// A feed item as stored in a user's notification list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A feed item to append. Every write creates a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedNotification {
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub kind: NotificationKind,
}

/// Response for listing the caller's feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsResponse {
    pub notifications: Vec<FeedNotification>,
    pub unread: i64,
    pub pagination: shared::pagination::PageInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_value() {
        assert_eq!(NotificationKind::EventUpdate.as_str(), "event_update");
        let json = serde_json::to_string(&NotificationKind::EventUpdate).unwrap();
        assert_eq!(json, "\"event_update\"");
        assert_eq!(
            NotificationKind::from_str("event_update"),
            Some(NotificationKind::EventUpdate)
        );
    }
}
