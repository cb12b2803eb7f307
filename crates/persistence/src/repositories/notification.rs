//! Feed notification repository.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{FeedNotification, NewFeedNotification};
use domain::services::FeedStore;
use sqlx::PgPool;
use uuid::Uuid;

use super::to_store_error;
use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

/// Repository for in-app feed items.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a feed item and return its id.
    pub async fn insert(&self, notification: &NewFeedNotification) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_notification");
        let id: Result<Uuid, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (user_id, event_id, title, body, link, kind)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.event_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(notification.kind.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();

        id
    }

    /// List a user's feed, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeedNotification>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications");
        let entities = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT id, user_id, event_id, title, body, link, kind, read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?
            .into_iter()
            .filter_map(NotificationEntity::into_domain)
            .collect())
    }

    /// Returns `(total, unread)` for a user's feed.
    pub async fn counts_for_user(&self, user_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
        let timer = QueryTimer::new("count_notifications");
        let counts: Result<(i64, i64), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT read)
            FROM notifications
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        counts
    }

    /// Mark a feed item read. Only the owning user may do so.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FeedStore for NotificationRepository {
    async fn insert_notification(
        &self,
        notification: NewFeedNotification,
    ) -> Result<Uuid, StoreError> {
        self.insert(&notification).await.map_err(to_store_error)
    }
}
