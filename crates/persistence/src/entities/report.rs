//! Report entity.

use chrono::{DateTime, Utc};
use domain::models::{Report, ReportKind, ReportStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for report kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_kind", rename_all = "lowercase")]
pub enum ReportKindDb {
    Event,
    Attendee,
}

impl From<ReportKindDb> for ReportKind {
    fn from(db: ReportKindDb) -> Self {
        match db {
            ReportKindDb::Event => ReportKind::Event,
            ReportKindDb::Attendee => ReportKind::Attendee,
        }
    }
}

impl From<ReportKind> for ReportKindDb {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Event => ReportKindDb::Event,
            ReportKind::Attendee => ReportKindDb::Attendee,
        }
    }
}

/// Database enum for report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
pub enum ReportStatusDb {
    Open,
    Resolved,
}

impl From<ReportStatusDb> for ReportStatus {
    fn from(db: ReportStatusDb) -> Self {
        match db {
            ReportStatusDb::Open => ReportStatus::Open,
            ReportStatusDb::Resolved => ReportStatus::Resolved,
        }
    }
}

/// Database row mapping for the reports table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportEntity {
    pub id: Uuid,
    pub kind: ReportKindDb,
    pub event_id: Uuid,
    pub event_title: String,
    pub attendee_email: Option<String>,
    pub reporter_id: Uuid,
    pub reporter_email: String,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatusDb,
    pub created_at: DateTime<Utc>,
}

impl From<ReportEntity> for Report {
    fn from(entity: ReportEntity) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind.into(),
            event_id: entity.event_id,
            event_title: entity.event_title,
            attendee_email: entity.attendee_email,
            reporter_id: entity.reporter_id,
            reporter_email: entity.reporter_email,
            reason: entity.reason,
            details: entity.details,
            status: entity.status.into(),
            created_at: entity.created_at,
        }
    }
}
