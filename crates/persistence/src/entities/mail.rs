//! Mail outbox entity.

use chrono::{DateTime, Utc};
use domain::models::{MailDocument, MailStatus, QueuedMail};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for mail delivery state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "mail_status", rename_all = "lowercase")]
pub enum MailStatusDb {
    Pending,
    Sent,
    Failed,
}

impl From<MailStatusDb> for MailStatus {
    fn from(db: MailStatusDb) -> Self {
        match db {
            MailStatusDb::Pending => MailStatus::Pending,
            MailStatusDb::Sent => MailStatus::Sent,
            MailStatusDb::Failed => MailStatus::Failed,
        }
    }
}

/// Database row mapping for the mail_outbox table.
#[derive(Debug, Clone, FromRow)]
pub struct MailEntity {
    pub id: Uuid,
    pub to_address: String,
    pub from_address: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub status: MailStatusDb,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<MailEntity> for QueuedMail {
    fn from(entity: MailEntity) -> Self {
        Self {
            id: entity.id,
            document: MailDocument {
                to: entity.to_address,
                from: entity.from_address,
                reply_to: entity.reply_to,
                subject: entity.subject,
                text: entity.text_body,
                html: entity.html_body,
            },
            status: entity.status.into(),
            attempts: entity.attempts,
            last_error: entity.last_error,
            created_at: entity.created_at,
            sent_at: entity.sent_at,
        }
    }
}
