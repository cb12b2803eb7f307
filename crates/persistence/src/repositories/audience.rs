//! Push subscription and registration repository.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{PushSubscription, Registration};
use domain::services::AudienceStore;
use sqlx::PgPool;
use uuid::Uuid;

use super::to_store_error;
use crate::entities::{PushSubscriptionEntity, RegistrationEntity};
use crate::metrics::QueryTimer;

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(Registration),
    /// The event reached its attendee cap.
    Full,
}

/// Repository for an event's audience records.
#[derive(Clone)]
pub struct AudienceRepository {
    pool: PgPool,
}

impl AudienceRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe a device token. Re-subscribing overwrites the owner.
    pub async fn upsert_subscription(
        &self,
        event_id: Uuid,
        token: &str,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<PushSubscription, sqlx::Error> {
        let timer = QueryTimer::new("upsert_push_subscription");
        let entity = sqlx::query_as::<_, PushSubscriptionEntity>(
            r#"
            INSERT INTO push_subscriptions (event_id, token, user_id, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, token) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                email = EXCLUDED.email,
                subscribed_at = NOW()
            RETURNING event_id, token, user_id, email, subscribed_at
            "#,
        )
        .bind(event_id)
        .bind(token)
        .bind(user_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity?.into())
    }

    /// List all subscriptions for an event.
    pub async fn list_subscriptions(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let timer = QueryTimer::new("list_push_subscriptions");
        let entities = sqlx::query_as::<_, PushSubscriptionEntity>(
            r#"
            SELECT event_id, token, user_id, email, subscribed_at
            FROM push_subscriptions
            WHERE event_id = $1
            ORDER BY subscribed_at
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?.into_iter().map(Into::into).collect())
    }

    /// Delete a subscription by key.
    pub async fn delete_subscription(
        &self,
        event_id: Uuid,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_push_subscription");
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscriptions
            WHERE event_id = $1 AND token = $2
            "#,
        )
        .bind(event_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// Delete a subscription on behalf of a user. Only the user's own or
    /// anonymous subscriptions match.
    pub async fn delete_own_subscription(
        &self,
        event_id: Uuid,
        token: &str,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_own_push_subscription");
        let result = sqlx::query(
            r#"
            DELETE FROM push_subscriptions
            WHERE event_id = $1 AND token = $2
              AND (user_id = $3 OR user_id IS NULL)
            "#,
        )
        .bind(event_id)
        .bind(token)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// Register a user, honoring the event's attendee cap.
    ///
    /// The event row is locked for the duration of the count so concurrent
    /// registrations serialize on it. Registering again refreshes the stored
    /// email and name and never counts against the cap. Returns `None` when
    /// the event does not exist.
    pub async fn register(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<RegisterOutcome>, sqlx::Error> {
        let timer = QueryTimer::new("register_for_event");
        let mut tx = self.pool.begin().await?;

        let cap: Option<Option<i32>> =
            sqlx::query_scalar("SELECT max_attendees FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(max_attendees) = cap else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        if let Some(max_attendees) = max_attendees {
            let (existing, count): (bool, i64) = sqlx::query_as(
                r#"
                SELECT
                    EXISTS (SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2),
                    (SELECT COUNT(*) FROM event_registrations WHERE event_id = $1)
                "#,
            )
            .bind(event_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

            if !existing && count >= i64::from(max_attendees) {
                tx.rollback().await?;
                timer.record();
                return Ok(Some(RegisterOutcome::Full));
            }
        }

        let entity = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            INSERT INTO event_registrations (event_id, user_id, email, name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, user_id) DO UPDATE SET
                email = EXCLUDED.email,
                name = COALESCE(EXCLUDED.name, event_registrations.name)
            RETURNING event_id, user_id, email, name, registered_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(email)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        Ok(Some(RegisterOutcome::Registered(entity.into())))
    }

    /// Remove a user's registration.
    pub async fn unregister(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("unregister_from_event");
        let result = sqlx::query(
            r#"
            DELETE FROM event_registrations
            WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// List all registrations for an event, oldest first.
    pub async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, sqlx::Error> {
        let timer = QueryTimer::new("list_event_registrations");
        let entities = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT event_id, user_id, email, name, registered_at
            FROM event_registrations
            WHERE event_id = $1
            ORDER BY registered_at
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl AudienceStore for AudienceRepository {
    async fn list_push_subscriptions(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        self.list_subscriptions(event_id)
            .await
            .map_err(to_store_error)
    }

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        self.list_registrations_for_event(event_id)
            .await
            .map_err(to_store_error)
    }

    async fn delete_push_subscription(
        &self,
        event_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError> {
        self.delete_subscription(event_id, token)
            .await
            .map_err(to_store_error)
    }
}
