//! Background job that drains the mail outbox.
//!
//! Each run claims a batch of pending documents (counting the attempt at
//! claim time) and hands them to the email provider. A document that keeps
//! failing is marked failed once it has used its attempts.

use persistence::repositories::MailRepository;
use tracing::{debug, warn};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_mail_delivery;
use crate::services::{EmailError, EmailService};

pub struct MailOutboxJob {
    mail: MailRepository,
    email: EmailService,
    interval_secs: u64,
    batch_size: i64,
    max_attempts: i32,
}

impl MailOutboxJob {
    pub fn new(
        mail: MailRepository,
        email: EmailService,
        interval_secs: u64,
        batch_size: i64,
        max_attempts: i32,
    ) -> Self {
        Self {
            mail,
            email,
            interval_secs,
            batch_size,
            max_attempts,
        }
    }
}

/// Metric label for one delivery attempt.
fn delivery_result(result: &Result<(), EmailError>) -> &'static str {
    match result {
        Ok(()) => "sent",
        Err(EmailError::InvalidAddress(_)) => "rejected",
        Err(_) => "failed",
    }
}

#[async_trait::async_trait]
impl Job for MailOutboxJob {
    fn name(&self) -> &'static str {
        "mail_outbox"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let batch = self
            .mail
            .claim_pending(self.batch_size)
            .await
            .map_err(|e| format!("Failed to claim mail: {}", e))?;

        if batch.is_empty() {
            debug!("Mail outbox empty");
            return Ok(());
        }

        let mut failures = 0usize;
        for queued in batch {
            let result = self.email.send(queued.document.into()).await;
            record_mail_delivery(delivery_result(&result));

            let write = match &result {
                Ok(()) => self.mail.mark_sent(queued.id).await,
                Err(e) => {
                    failures += 1;
                    warn!(
                        mail_id = %queued.id,
                        attempt = queued.attempts,
                        error = %e,
                        "Mail delivery failed"
                    );
                    // Unsendable addresses never recover; spend every attempt now.
                    let max_attempts = if matches!(e, EmailError::InvalidAddress(_)) {
                        queued.attempts
                    } else {
                        self.max_attempts
                    };
                    self.mail
                        .record_failure(queued.id, &e.to_string(), max_attempts)
                        .await
                }
            };

            if let Err(e) = write {
                return Err(format!("Failed to update mail {}: {}", queued.id, e));
            }
        }

        if failures > 0 {
            warn!(failures = failures, "Mail outbox run finished with failures");
        }
        Ok(())
    }
}
