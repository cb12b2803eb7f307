//! Mail outbox repository.

use async_trait::async_trait;
use domain::errors::StoreError;
use domain::models::{MailDocument, QueuedMail};
use domain::services::MailQueue;
use sqlx::PgPool;
use uuid::Uuid;

use super::to_store_error;
use crate::entities::MailEntity;
use crate::metrics::QueryTimer;

const MAIL_COLUMNS: &str = "id, to_address, from_address, reply_to, subject, text_body, \
    html_body, status, attempts, last_error, created_at, sent_at";

/// Repository for the outbound mail queue.
#[derive(Clone)]
pub struct MailRepository {
    pool: PgPool,
}

impl MailRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queue a mail document for delivery.
    pub async fn insert(&self, document: &MailDocument) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("enqueue_mail");
        let id: Result<Uuid, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO mail_outbox (to_address, from_address, reply_to, subject, text_body, html_body)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&document.to)
        .bind(&document.from)
        .bind(&document.reply_to)
        .bind(&document.subject)
        .bind(&document.text)
        .bind(&document.html)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        id
    }

    /// Claims up to `limit` pending documents and counts the attempt.
    ///
    /// Rows locked by another worker are skipped.
    pub async fn claim_pending(&self, limit: i64) -> Result<Vec<QueuedMail>, sqlx::Error> {
        let timer = QueryTimer::new("claim_pending_mail");
        let entities = sqlx::query_as::<_, MailEntity>(&format!(
            r#"
            UPDATE mail_outbox
            SET attempts = attempts + 1
            WHERE id IN (
                SELECT id FROM mail_outbox
                WHERE status = 'pending'
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {MAIL_COLUMNS}
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(entities?.into_iter().map(Into::into).collect())
    }

    /// Mark a document delivered.
    pub async fn mark_sent(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_mail_sent");
        let result = sqlx::query(
            r#"
            UPDATE mail_outbox
            SET status = 'sent', sent_at = NOW(), last_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }

    /// Record a delivery failure. The document stays pending until it has
    /// used `max_attempts`, then it is marked failed.
    pub async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        max_attempts: i32,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("record_mail_failure");
        let result = sqlx::query(
            r#"
            UPDATE mail_outbox
            SET last_error = $2,
                status = CASE WHEN attempts >= $3 THEN 'failed'::mail_status ELSE status END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;
        timer.record();

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MailQueue for MailRepository {
    async fn enqueue(&self, document: MailDocument) -> Result<Uuid, StoreError> {
        self.insert(&document).await.map_err(to_store_error)
    }
}
