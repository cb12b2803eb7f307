//! Event-change notification pipeline.
//!
//! Change detection, audience resolution and dispatch chained together for
//! one event update.

use std::time::Duration;

use uuid::Uuid;

use crate::models::Event;
use crate::services::audience::AudienceResolver;
use crate::services::change_detection::{detect_changes, summarize};
use crate::services::dispatcher::{ChangeNotice, DeliveryDispatcher, DispatchReport};

/// What happened to one event update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Drafts and unpublished events never notify.
    NotPublished,
    /// Neither time nor location changed.
    NoChanges,
    /// The audience could not be read after every attempt.
    AudienceUnavailable(String),
    Dispatched(DispatchReport),
}

impl PipelineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::NotPublished => "not_published",
            PipelineOutcome::NoChanges => "no_changes",
            PipelineOutcome::AudienceUnavailable(_) => "audience_unavailable",
            PipelineOutcome::Dispatched(_) => "dispatched",
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Public base URL of the web app; deep links point below it.
    pub app_base_url: String,
    /// Attempts at reading the audience before giving up.
    pub resolve_attempts: u32,
    pub resolve_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            app_base_url: "http://localhost:3000".to_string(),
            resolve_attempts: 3,
            resolve_backoff: Duration::from_millis(200),
        }
    }
}

/// Runs the notification pipeline for event updates.
#[derive(Clone)]
pub struct NotificationPipeline {
    resolver: AudienceResolver,
    dispatcher: DeliveryDispatcher,
    config: PipelineConfig,
}

impl NotificationPipeline {
    pub fn new(
        resolver: AudienceResolver,
        dispatcher: DeliveryDispatcher,
        config: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            config,
        }
    }

    /// Deep link to an event page.
    pub fn event_link(&self, event_id: Uuid) -> String {
        format!(
            "{}/events/{}",
            self.config.app_base_url.trim_end_matches('/'),
            event_id
        )
    }

    /// Handles one update from `before` to `after`.
    pub async fn on_event_updated(
        &self,
        before: Option<&Event>,
        after: Option<&Event>,
    ) -> PipelineOutcome {
        let Some(event) = after else {
            return PipelineOutcome::NoChanges;
        };
        if !event.is_published() {
            return PipelineOutcome::NotPublished;
        }

        let after_snapshot = event.snapshot();
        let changes = detect_changes(
            before.map(Event::snapshot).as_ref(),
            Some(&after_snapshot),
        );
        if changes.is_empty() {
            tracing::debug!(event_id = %event.id, "Event update is not notify-worthy");
            return PipelineOutcome::NoChanges;
        }

        let audience = match self.resolve_with_retry(event.id).await {
            Ok(audience) => audience,
            Err(reason) => return PipelineOutcome::AudienceUnavailable(reason),
        };

        let notice = ChangeNotice {
            event_id: event.id,
            title: event.title.clone(),
            summary: summarize(&changes, &after_snapshot),
            changes,
            link: self.event_link(event.id),
        };

        PipelineOutcome::Dispatched(self.dispatcher.dispatch(&notice, &audience).await)
    }

    async fn resolve_with_retry(
        &self,
        event_id: Uuid,
    ) -> Result<crate::services::audience::Audience, String> {
        let attempts = self.config.resolve_attempts.max(1);
        let mut backoff = self.config.resolve_backoff;
        let mut attempt = 1;

        loop {
            match self.resolver.resolve(event_id).await {
                Ok(audience) => return Ok(audience),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        event_id = %event_id,
                        attempt = attempt,
                        error = %e,
                        "Audience read failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event_id,
                        attempts = attempt,
                        error = %e,
                        "Audience read failed, dropping notification"
                    );
                    return Err(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::models::{EventStatus, NotificationKind};
    use crate::services::dispatcher::DispatchConfig;
    use crate::services::memory::InMemoryStore;
    use crate::services::push::MockPushGateway;

    fn pipeline(store: &Arc<InMemoryStore>, push: &Arc<MockPushGateway>) -> NotificationPipeline {
        NotificationPipeline::new(
            AudienceResolver::new(store.clone()),
            DeliveryDispatcher::new(
                push.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                DispatchConfig::default(),
            ),
            PipelineConfig {
                app_base_url: "https://events.depauw.edu/".to_string(),
                resolve_attempts: 2,
                resolve_backoff: Duration::from_millis(1),
            },
        )
    }

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Career Fair".to_string(),
            description: None,
            category: None,
            organization: None,
            contact_email: None,
            start_time: Some(start),
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap()),
            location_name: Some("Union Building".to_string()),
            latitude: None,
            longitude: None,
            max_attendees: None,
            rsvp_required: false,
            status: EventStatus::Published,
            created_at: start,
            updated_at: start,
        }
    }

    fn rescheduled(before: &Event) -> Event {
        Event {
            start_time: Some(Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap()),
            end_time: Some(Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap()),
            ..before.clone()
        }
    }

    #[tokio::test]
    async fn test_time_change_end_to_end() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let before = event();
        let after = rescheduled(&before);

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.add_registration(before.id, alice, Some("Alice@depauw.edu"));
        store.add_registration(before.id, bob, Some("alice@depauw.edu"));

        let outcome = p.on_event_updated(Some(&before), Some(&after)).await;

        let PipelineOutcome::Dispatched(report) = outcome else {
            panic!("expected dispatch, got {outcome:?}");
        };
        assert!(push.sent().is_empty());
        assert!(report.push.chunks.is_empty());

        let feed = store.feed_items();
        assert_eq!(feed.len(), 2);
        assert!(feed.iter().all(|f| f.kind == NotificationKind::EventUpdate));
        assert_eq!(
            feed[0].link.as_deref(),
            Some(format!("https://events.depauw.edu/events/{}", before.id).as_str())
        );

        let mail = store.mail_documents();
        assert_eq!(mail.len(), 1);
        assert_eq!(mail[0].to, "alice@depauw.edu");
        assert_eq!(mail[0].subject, "Event updated: Career Fair");
        assert!(mail[0].text.starts_with("New time: Sat, Mar 1, 2:00 PM UTC"));
    }

    #[tokio::test]
    async fn test_subscriber_and_registrant_get_one_feed_item() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let before = event();
        let user = Uuid::new_v4();
        store.add_push_subscription(before.id, "device-1", Some(user), None);
        store.add_registration(before.id, user, Some("u@depauw.edu"));

        p.on_event_updated(Some(&before), Some(&rescheduled(&before)))
            .await;

        assert_eq!(store.feed_items().len(), 1);
        assert_eq!(push.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_irrelevant_edit_sends_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let before = event();
        store.add_push_subscription(before.id, "device-1", Some(Uuid::new_v4()), None);
        let after = Event {
            title: "Career Fair 2025".to_string(),
            description: Some("Bring resumes".to_string()),
            ..before.clone()
        };

        let outcome = p.on_event_updated(Some(&before), Some(&after)).await;

        assert_eq!(outcome, PipelineOutcome::NoChanges);
        assert!(push.sent().is_empty());
        assert!(store.feed_items().is_empty());
        assert!(store.mail_documents().is_empty());
    }

    #[tokio::test]
    async fn test_drafts_do_not_notify() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let before = Event {
            status: EventStatus::Draft,
            ..event()
        };
        store.add_registration(before.id, Uuid::new_v4(), Some("u@depauw.edu"));

        let outcome = p
            .on_event_updated(Some(&before), Some(&rescheduled(&before)))
            .await;

        assert_eq!(outcome, PipelineOutcome::NotPublished);
        assert!(store.feed_items().is_empty());
    }

    #[tokio::test]
    async fn test_creation_and_deletion_do_not_notify() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let e = event();

        assert_eq!(
            p.on_event_updated(None, Some(&e)).await,
            PipelineOutcome::NoChanges
        );
        assert_eq!(
            p.on_event_updated(Some(&e), None).await,
            PipelineOutcome::NoChanges
        );
    }

    #[tokio::test]
    async fn test_audience_failure_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        store.set_audience_unavailable(true);
        let push = Arc::new(MockPushGateway::new());
        let p = pipeline(&store, &push);
        let before = event();

        let outcome = p
            .on_event_updated(Some(&before), Some(&rescheduled(&before)))
            .await;

        assert!(matches!(outcome, PipelineOutcome::AudienceUnavailable(_)));
        assert_eq!(outcome.label(), "audience_unavailable");
    }
}
