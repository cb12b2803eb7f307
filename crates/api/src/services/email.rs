//! Email service for delivering queued mail documents.
//!
//! Supports multiple email providers:
//! - `console`: Logs emails to console (development)
//! - `sendgrid`: Uses SendGrid API

use std::sync::Arc;
use std::time::Duration;

use domain::models::MailDocument;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    /// Plain text body
    pub body_text: String,
    /// HTML body, omitted when empty
    pub body_html: Option<String>,
}

impl From<MailDocument> for EmailMessage {
    fn from(doc: MailDocument) -> Self {
        Self {
            to: doc.to,
            from: doc.from,
            reply_to: doc.reply_to,
            subject: doc.subject,
            body_text: doc.text,
            body_html: Some(doc.html).filter(|h| !h.is_empty()),
        }
    }
}

/// Splits `"Name <addr@host>"` into its parts; a bare address has no name.
fn parse_mailbox(mailbox: &str) -> (Option<&str>, &str) {
    match (mailbox.find('<'), mailbox.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = mailbox[..open].trim().trim_matches('"').trim();
            let addr = mailbox[open + 1..close].trim();
            ((!name.is_empty()).then_some(name), addr)
        }
        _ => (None, mailbox.trim()),
    }
}

fn mailbox_json(mailbox: &str) -> serde_json::Value {
    match parse_mailbox(mailbox) {
        (Some(name), email) => json!({ "email": email, "name": name }),
        (None, email) => json!({ "email": email }),
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    /// Creates a new EmailService with the given configuration.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EmailError::SendFailed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, refusing send"
            );
            return Err(EmailError::Disabled);
        }

        if !shared::validation::is_email(parse_mailbox(&message.to).1) {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            from = %message.from,
            reply_to = ?message.reply_to,
            subject = %message.subject,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body (plain text)");

        Ok(())
    }

    fn sendgrid_body(message: &EmailMessage) -> serde_json::Value {
        let mut content = vec![json!({ "type": "text/plain", "value": message.body_text })];
        if let Some(html) = &message.body_html {
            content.push(json!({ "type": "text/html", "value": html }));
        }

        let mut body = json!({
            "personalizations": [{ "to": [mailbox_json(&message.to)] }],
            "from": mailbox_json(&message.from),
            "subject": message.subject,
            "content": content,
        });
        if let Some(reply_to) = &message.reply_to {
            body["reply_to"] = mailbox_json(reply_to);
        }
        body
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&Self::sendgrid_body(&message))
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(
                to = %message.to,
                subject = %message.subject,
                "Email sent via SendGrid"
            );
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: "console".to_string(),
            ..Default::default()
        }
    }

    fn document() -> MailDocument {
        MailDocument {
            to: "alice@depauw.edu".to_string(),
            from: "Campus Events <no-reply@depauw.edu>".to_string(),
            reply_to: Some("events@depauw.edu".to_string()),
            subject: "Event updated: Career Fair".to_string(),
            text: "New time: Sat, Mar 1, 2:00 PM UTC.".to_string(),
            html: "<p>New time: Sat, Mar 1, 2:00 PM UTC.</p>".to_string(),
        }
    }

    #[test]
    fn test_message_from_document() {
        let message = EmailMessage::from(document());
        assert_eq!(message.to, "alice@depauw.edu");
        assert_eq!(message.body_text, "New time: Sat, Mar 1, 2:00 PM UTC.");
        assert!(message.body_html.is_some());

        let bare = EmailMessage::from(MailDocument {
            html: String::new(),
            ..document()
        });
        assert!(bare.body_html.is_none());
    }

    #[test]
    fn test_parse_mailbox() {
        assert_eq!(
            parse_mailbox("Campus Events <no-reply@depauw.edu>"),
            (Some("Campus Events"), "no-reply@depauw.edu")
        );
        assert_eq!(parse_mailbox(" a@depauw.edu "), (None, "a@depauw.edu"));
        assert_eq!(parse_mailbox("<a@depauw.edu>"), (None, "a@depauw.edu"));
    }

    #[test]
    fn test_sendgrid_body_shape() {
        let body = EmailService::sendgrid_body(&document().into());
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "alice@depauw.edu");
        assert_eq!(body["from"]["email"], "no-reply@depauw.edu");
        assert_eq!(body["from"]["name"], "Campus Events");
        assert_eq!(body["reply_to"]["email"], "events@depauw.edu");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["type"], "text/html");
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config()).unwrap();
        tokio_test::assert_ok!(service.send(document().into()).await);
    }

    #[tokio::test]
    async fn test_send_disabled_is_an_error() {
        let service = EmailService::new(EmailConfig::default()).unwrap();
        assert!(!service.is_enabled());
        let result = service.send(document().into()).await;
        assert!(matches!(result, Err(EmailError::Disabled)));
    }

    #[tokio::test]
    async fn test_send_rejects_invalid_recipient() {
        let service = EmailService::new(test_config()).unwrap();
        let message = EmailMessage {
            to: "not-an-address".to_string(),
            ..EmailMessage::from(document())
        };
        let result = service.send(message).await;
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_not_configured() {
        let service = EmailService::new(EmailConfig {
            enabled: true,
            provider: "sendgrid".to_string(),
            ..Default::default()
        })
        .unwrap();
        let result = service.send(document().into()).await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
