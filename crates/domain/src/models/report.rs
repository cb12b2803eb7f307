//! Moderation reports filed by users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Resolved,
}

impl ReportStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Open => "open",
            ReportStatus::Resolved => "resolved",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(ReportStatus::Open),
            "resolved" => Some(ReportStatus::Resolved),
            _ => None,
        }
    }
}

/// What a report is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// The event listing itself.
    Event,
    /// An attendee registered for the event.
    Attendee,
}

impl ReportKind {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Event => "event",
            ReportKind::Attendee => "attendee",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "event" => Some(ReportKind::Event),
            "attendee" => Some(ReportKind::Attendee),
            _ => None,
        }
    }
}

/// A moderation report against an event or one of its attendees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub kind: ReportKind,
    pub event_id: Uuid,
    pub event_title: String,
    pub attendee_email: Option<String>,
    pub reporter_id: Uuid,
    pub reporter_email: String,
    pub reason: String,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Request payload for reporting an event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub kind: ReportKind,

    pub event_id: Uuid,

    #[validate(email(message = "Attendee email must be a valid email"))]
    pub attendee_email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Reason must be 1-100 characters"))]
    pub reason: String,

    #[validate(length(max = 2000, message = "Details must be at most 2000 characters"))]
    pub details: Option<String>,
}

impl CreateReportRequest {
    /// Attendee reports must name the attendee.
    pub fn validate_target(&self) -> Result<(), validator::ValidationError> {
        if self.kind == ReportKind::Attendee && self.attendee_email.is_none() {
            let mut err = validator::ValidationError::new("attendee_email");
            err.message = Some("Attendee reports require an attendee email".into());
            return Err(err);
        }
        Ok(())
    }
}

/// Response for listing reports (admin view).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsResponse {
    pub reports: Vec<Report>,
    pub pagination: shared::pagination::PageInfo,
}
