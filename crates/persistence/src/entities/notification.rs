//! Feed notification entity.

use chrono::{DateTime, Utc};
use domain::models::{FeedNotification, NotificationKind};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationEntity {
    /// Converts to the domain model. Rows with an unknown kind are skipped
    /// with a warning.
    pub fn into_domain(self) -> Option<FeedNotification> {
        let Some(kind) = NotificationKind::from_str(&self.kind) else {
            tracing::warn!(
                notification_id = %self.id,
                user_id = %self.user_id,
                kind = %self.kind,
                "Skipping notification with unknown kind"
            );
            return None;
        };
        Some(FeedNotification {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            title: self.title,
            body: self.body,
            link: self.link,
            kind,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: &str) -> NotificationEntity {
        NotificationEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Some(Uuid::new_v4()),
            title: "Event updated: Trivia Night".to_string(),
            body: "New location: Hub.".to_string(),
            link: None,
            kind: kind.to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_known_kind_converts() {
        let n = entity("event_update").into_domain().unwrap();
        assert_eq!(n.kind, NotificationKind::EventUpdate);
    }

    #[test]
    fn test_unknown_kind_is_skipped() {
        assert!(entity("promo").into_domain().is_none());
    }
}
