//! Report repository.

use domain::models::report::CreateReportRequest;
use domain::models::{Event, Report};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ReportEntity, ReportKindDb};
use crate::metrics::QueryTimer;

const REPORT_COLUMNS: &str = "id, kind, event_id, event_title, attendee_email, reporter_id, \
    reporter_email, reason, details, status, created_at";

/// Repository for moderation reports.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        event: &Event,
        reporter_id: Uuid,
        reporter_email: &str,
        request: &CreateReportRequest,
    ) -> Result<Report, sqlx::Error> {
        let timer = QueryTimer::new("create_report");
        let entity = sqlx::query_as::<_, ReportEntity>(&format!(
            r#"
            INSERT INTO reports (kind, event_id, event_title, attendee_email, reporter_id,
                                 reporter_email, reason, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(ReportKindDb::from(request.kind))
        .bind(event.id)
        .bind(&event.title)
        .bind(&request.attendee_email)
        .bind(reporter_id)
        .bind(reporter_email)
        .bind(&request.reason)
        .bind(&request.details)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity?.into())
    }

    /// List reports, newest first. Returns the page and the total.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<Report>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_reports");
        let entities = sqlx::query_as::<_, ReportEntity>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await?;
        timer.record();

        Ok((entities.into_iter().map(Into::into).collect(), total))
    }
}
