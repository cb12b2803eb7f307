//! Saved event repository.

use domain::models::{Event, SavedEvent};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::SavedEventEntity;
use crate::metrics::QueryTimer;

/// Repository for a user's saved events.
#[derive(Clone)]
pub struct SavedEventRepository {
    pool: PgPool,
}

impl SavedEventRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Save an event, copying its current summary.
    pub async fn save(&self, user_id: Uuid, event: &Event) -> Result<SavedEvent, sqlx::Error> {
        let timer = QueryTimer::new("save_event");
        let entity = sqlx::query_as::<_, SavedEventEntity>(
            r#"
            INSERT INTO saved_events (user_id, event_id, title, start_time, end_time, location_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                title = EXCLUDED.title,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                location_name = EXCLUDED.location_name
            RETURNING user_id, event_id, title, start_time, end_time, location_name, saved_at
            "#,
        )
        .bind(user_id)
        .bind(event.id)
        .bind(&event.title)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.location_name)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity?.into())
    }

    /// Remove a saved event.
    pub async fn unsave(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("unsave_event");
        let result = sqlx::query("DELETE FROM saved_events WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// List a user's saved events, soonest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedEvent>, sqlx::Error> {
        let timer = QueryTimer::new("list_saved_events");
        let entities = sqlx::query_as::<_, SavedEventEntity>(
            r#"
            SELECT user_id, event_id, title, start_time, end_time, location_name, saved_at
            FROM saved_events
            WHERE user_id = $1
            ORDER BY start_time ASC NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?.into_iter().map(Into::into).collect())
    }

    /// Rewrites the denormalized summary on every saved copy of `event`.
    pub async fn refresh_summaries(&self, event: &Event) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("refresh_saved_event_summaries");
        let result = sqlx::query(
            r#"
            UPDATE saved_events
            SET title = $2, start_time = $3, end_time = $4, location_name = $5
            WHERE event_id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.location_name)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected())
    }
}
