//! Multi-channel delivery of event change notifications.
//!
//! One notice goes out on three independent channels: push multicasts to
//! subscribed devices, one in-app feed item per user, and one mail document
//! per registrant email. A failure on one channel (or one recipient) is
//! logged and reported, never propagated, and never undoes another channel.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::models::{MailDocument, NewFeedNotification, NotificationKind};
use crate::services::audience::{Audience, PushTarget};
use crate::services::change_detection::ChangeSet;
use crate::services::ports::{AudienceStore, FeedStore, MailQueue};
use crate::services::push::{MulticastMessage, PushGateway, MAX_MULTICAST_TOKENS};

const TASK_PANICKED: &str = "task panicked";

/// What changed about an event, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub event_id: Uuid,
    pub title: String,
    pub changes: ChangeSet,
    /// Human-readable summary used as the message body.
    pub summary: String,
    /// Deep link to the event page.
    pub link: String,
}

impl ChangeNotice {
    /// Heading shared by push, feed and mail.
    pub fn heading(&self) -> String {
        format!("Event updated: {}", self.title)
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Tokens per multicast. Values above 500 are capped.
    pub push_chunk_size: usize,
    pub mail_from: String,
    pub reply_to: Option<String>,
}

impl DispatchConfig {
    pub fn chunk_size(&self) -> usize {
        self.push_chunk_size.clamp(1, MAX_MULTICAST_TOKENS)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            push_chunk_size: MAX_MULTICAST_TOKENS,
            mail_from: "Campus Events <no-reply@localhost>".to_string(),
            reply_to: None,
        }
    }
}

/// Outcome of a single delivery unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Push channel summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// One entry per multicast, in send order.
    pub chunks: Vec<DeliveryOutcome>,
    pub tokens_sent: usize,
    pub tokens_failed: usize,
    /// Tokens whose subscription was deleted.
    pub pruned: Vec<String>,
}

/// Aggregated result of one dispatch across every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub push: PushReport,
    pub feed: Vec<(Uuid, DeliveryOutcome)>,
    pub email: Vec<(String, DeliveryOutcome)>,
}

impl DispatchReport {
    pub fn feed_delivered(&self) -> usize {
        self.feed.iter().filter(|(_, o)| o.is_delivered()).count()
    }

    pub fn emails_enqueued(&self) -> usize {
        self.email.iter().filter(|(_, o)| o.is_delivered()).count()
    }

    /// Number of failed units across channels (push counted per chunk).
    pub fn failures(&self) -> usize {
        self.push.chunks.iter().filter(|o| !o.is_delivered()).count()
            + self.feed.iter().filter(|(_, o)| !o.is_delivered()).count()
            + self.email.iter().filter(|(_, o)| !o.is_delivered()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

/// Sends change notices to push, feed and mail.
#[derive(Clone)]
pub struct DeliveryDispatcher {
    push: Arc<dyn PushGateway>,
    subscriptions: Arc<dyn AudienceStore>,
    feed: Arc<dyn FeedStore>,
    mail: Arc<dyn MailQueue>,
    config: DispatchConfig,
}

impl DeliveryDispatcher {
    pub fn new(
        push: Arc<dyn PushGateway>,
        subscriptions: Arc<dyn AudienceStore>,
        feed: Arc<dyn FeedStore>,
        mail: Arc<dyn MailQueue>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            push,
            subscriptions,
            feed,
            mail,
            config,
        }
    }

    /// Delivers `notice` to `audience`. Never fails; inspect the report.
    pub async fn dispatch(&self, notice: &ChangeNotice, audience: &Audience) -> DispatchReport {
        let (push, feed, email) = tokio::join!(
            self.send_push(notice, &audience.push_targets),
            self.write_feed(notice, &audience.user_ids),
            self.enqueue_mail(notice, &audience.emails),
        );

        let report = DispatchReport { push, feed, email };

        tracing::info!(
            event_id = %notice.event_id,
            changes = %notice.changes.label(),
            push_chunks = report.push.chunks.len(),
            push_sent = report.push.tokens_sent,
            push_pruned = report.push.pruned.len(),
            feed_delivered = report.feed_delivered(),
            emails_enqueued = report.emails_enqueued(),
            failures = report.failures(),
            "Dispatched event change notification"
        );

        report
    }

    fn push_data(&self, notice: &ChangeNotice) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("type".to_string(), NotificationKind::EventUpdate.as_str().to_string()),
            ("eventId".to_string(), notice.event_id.to_string()),
            ("changes".to_string(), notice.changes.label()),
            ("url".to_string(), notice.link.clone()),
        ])
    }

    /// Sends chunks one after another so an interrupted dispatch keeps the
    /// chunks already sent.
    async fn send_push(&self, notice: &ChangeNotice, targets: &[PushTarget]) -> PushReport {
        let mut report = PushReport::default();
        if targets.is_empty() {
            return report;
        }

        let owners: HashMap<&str, Option<Uuid>> = targets
            .iter()
            .map(|t| (t.token.as_str(), t.user_id))
            .collect();
        let data = self.push_data(notice);

        for (index, chunk) in targets.chunks(self.config.chunk_size()).enumerate() {
            let message = MulticastMessage {
                tokens: chunk.iter().map(|t| t.token.clone()).collect(),
                title: notice.heading(),
                body: notice.summary.clone(),
                data: data.clone(),
                link: Some(notice.link.clone()),
            };

            let response = match self.push.send_multicast(&message).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        event_id = %notice.event_id,
                        chunk = index,
                        tokens = chunk.len(),
                        error = %e,
                        "Push multicast failed, continuing with next chunk"
                    );
                    report.tokens_failed += chunk.len();
                    report.chunks.push(DeliveryOutcome::Failed(e.to_string()));
                    continue;
                }
            };

            report.tokens_sent += response.success_count();
            report.tokens_failed += response.failure_count();
            report.chunks.push(DeliveryOutcome::Delivered);

            for token in response.unregistered_tokens() {
                match self
                    .subscriptions
                    .delete_push_subscription(notice.event_id, token)
                    .await
                {
                    Ok(_) => {
                        tracing::info!(
                            event_id = %notice.event_id,
                            user_id = ?owners.get(token).copied().flatten(),
                            "Pruned unregistered push token"
                        );
                        report.pruned.push(token.to_string());
                    }
                    Err(e) => {
                        tracing::warn!(
                            event_id = %notice.event_id,
                            error = %e,
                            "Failed to prune unregistered push token"
                        );
                    }
                }
            }
        }

        report
    }

    async fn write_feed(
        &self,
        notice: &ChangeNotice,
        user_ids: &[Uuid],
    ) -> Vec<(Uuid, DeliveryOutcome)> {
        let mut tasks = JoinSet::new();
        for &user_id in user_ids {
            let feed = Arc::clone(&self.feed);
            let item = NewFeedNotification {
                user_id,
                event_id: Some(notice.event_id),
                title: notice.heading(),
                body: notice.summary.clone(),
                link: Some(notice.link.clone()),
                kind: NotificationKind::EventUpdate,
            };
            tasks.spawn(async move { (user_id, feed.insert_notification(item).await) });
        }

        let mut pending: HashSet<Uuid> = user_ids.iter().copied().collect();
        let mut outcomes = Vec::with_capacity(user_ids.len());
        while let Some(joined) = tasks.join_next().await {
            if let Ok((user_id, _)) = &joined {
                pending.remove(user_id);
            }
            match joined {
                Ok((user_id, Ok(_))) => outcomes.push((user_id, DeliveryOutcome::Delivered)),
                Ok((user_id, Err(e))) => {
                    tracing::warn!(
                        event_id = %notice.event_id,
                        user_id = %user_id,
                        error = %e,
                        "Failed to write feed notification"
                    );
                    outcomes.push((user_id, DeliveryOutcome::Failed(e.to_string())));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Feed write task panicked");
                }
            }
        }
        outcomes.extend(
            pending
                .into_iter()
                .map(|user_id| (user_id, DeliveryOutcome::Failed(TASK_PANICKED.to_string()))),
        );
        outcomes
    }

    fn mail_document(&self, notice: &ChangeNotice, to: &str) -> MailDocument {
        MailDocument {
            to: to.to_string(),
            from: self.config.mail_from.clone(),
            reply_to: self.config.reply_to.clone(),
            subject: notice.heading(),
            text: format!("{}\n\nView event: {}", notice.summary, notice.link),
            html: format!(
                "<p>{}</p><p><a href=\"{}\">View event</a></p>",
                escape_html(&notice.summary),
                escape_html(&notice.link)
            ),
        }
    }

    async fn enqueue_mail(
        &self,
        notice: &ChangeNotice,
        emails: &[String],
    ) -> Vec<(String, DeliveryOutcome)> {
        let mut tasks = JoinSet::new();
        for email in emails {
            let mail = Arc::clone(&self.mail);
            let document = self.mail_document(notice, email);
            let email = email.clone();
            tasks.spawn(async move {
                let result = mail.enqueue(document).await;
                (email, result)
            });
        }

        let mut pending: HashSet<String> = emails.iter().cloned().collect();
        let mut outcomes = Vec::with_capacity(emails.len());
        while let Some(joined) = tasks.join_next().await {
            if let Ok((email, _)) = &joined {
                pending.remove(email);
            }
            match joined {
                Ok((email, Ok(_))) => outcomes.push((email, DeliveryOutcome::Delivered)),
                Ok((email, Err(e))) => {
                    tracing::warn!(
                        event_id = %notice.event_id,
                        error = %e,
                        "Failed to enqueue update email"
                    );
                    outcomes.push((email, DeliveryOutcome::Failed(e.to_string())));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Mail enqueue task panicked");
                }
            }
        }
        outcomes.extend(
            pending
                .into_iter()
                .map(|email| (email, DeliveryOutcome::Failed(TASK_PANICKED.to_string()))),
        );
        outcomes
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::change_detection::ChangeTag;
    use crate::services::memory::InMemoryStore;
    use crate::services::push::MockPushGateway;

    fn notice(event_id: Uuid) -> ChangeNotice {
        ChangeNotice {
            event_id,
            title: "Spring Concert".to_string(),
            changes: ChangeSet::from_iter([ChangeTag::Time]),
            summary: "New time: Sat, Mar 1, 2:00 PM UTC to 3:00 PM UTC.".to_string(),
            link: format!("https://events.example.edu/events/{}", event_id),
        }
    }

    fn dispatcher(
        push: Arc<MockPushGateway>,
        store: Arc<InMemoryStore>,
        chunk: usize,
    ) -> DeliveryDispatcher {
        DeliveryDispatcher::new(
            push,
            store.clone(),
            store.clone(),
            store,
            DispatchConfig {
                push_chunk_size: chunk,
                mail_from: "Campus Events <events@depauw.edu>".to_string(),
                reply_to: Some("help@depauw.edu".to_string()),
            },
        )
    }

    fn targets(n: usize) -> Vec<PushTarget> {
        (0..n)
            .map(|i| PushTarget {
                token: format!("tok-{i}"),
                user_id: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_tokens_sent_in_chunks_of_500() {
        let push = Arc::new(MockPushGateway::new());
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(push.clone(), store, 500);
        let audience = Audience {
            push_targets: targets(1201),
            ..Default::default()
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        let sizes: Vec<usize> = push.sent().iter().map(|m| m.tokens.len()).collect();
        assert_eq!(sizes, vec![500, 500, 201]);
        assert_eq!(report.push.tokens_sent, 1201);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_chunk_size_capped_at_provider_limit() {
        let push = Arc::new(MockPushGateway::new());
        let d = dispatcher(push.clone(), Arc::new(InMemoryStore::new()), 2000);
        let audience = Audience {
            push_targets: targets(600),
            ..Default::default()
        };

        d.dispatch(&notice(Uuid::new_v4()), &audience).await;
        assert_eq!(push.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_no_tokens_no_multicast() {
        let push = Arc::new(MockPushGateway::new());
        let d = dispatcher(push.clone(), Arc::new(InMemoryStore::new()), 500);
        let report = d.dispatch(&notice(Uuid::new_v4()), &Audience::default()).await;
        assert!(push.sent().is_empty());
        assert!(report.push.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_tokens_are_pruned() {
        let event = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        store.add_push_subscription(event, "good", None, None);
        store.add_push_subscription(event, "stale", Some(Uuid::new_v4()), None);
        let push = Arc::new(MockPushGateway::new().with_unregistered(["stale"]));
        let d = dispatcher(push, store.clone(), 500);

        let audience = Audience {
            push_targets: vec![
                PushTarget {
                    token: "good".to_string(),
                    user_id: None,
                },
                PushTarget {
                    token: "stale".to_string(),
                    user_id: None,
                },
            ],
            ..Default::default()
        };
        let report = d.dispatch(&notice(event), &audience).await;

        assert_eq!(report.push.pruned, vec!["stale".to_string()]);
        assert_eq!(store.push_tokens(event), vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_tokens_in_later_chunks_are_pruned() {
        let event = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        for token in ["tok-10", "tok-750", "tok-1100"] {
            store.add_push_subscription(event, token, None, None);
        }
        let push = Arc::new(MockPushGateway::new().with_unregistered(["tok-750", "tok-1100"]));
        let d = dispatcher(push.clone(), store.clone(), 500);
        let audience = Audience {
            push_targets: targets(1201),
            ..Default::default()
        };

        let report = d.dispatch(&notice(event), &audience).await;

        assert_eq!(push.sent().len(), 3);
        let mut pruned = report.push.pruned.clone();
        pruned.sort();
        assert_eq!(pruned, vec!["tok-1100".to_string(), "tok-750".to_string()]);
        assert_eq!(store.push_tokens(event), vec!["tok-10".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort_later_chunks() {
        let push = Arc::new(MockPushGateway::new().failing_call(0));
        let d = dispatcher(push.clone(), Arc::new(InMemoryStore::new()), 500);
        let audience = Audience {
            push_targets: targets(700),
            ..Default::default()
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        assert_eq!(push.sent().len(), 2);
        assert!(!report.push.chunks[0].is_delivered());
        assert!(report.push.chunks[1].is_delivered());
        assert_eq!(report.push.tokens_sent, 200);
        assert_eq!(report.push.tokens_failed, 500);
    }

    #[tokio::test]
    async fn test_one_feed_item_per_user() {
        let event = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(Arc::new(MockPushGateway::new()), store.clone(), 500);
        let users = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let audience = Audience {
            user_ids: users.clone(),
            ..Default::default()
        };

        let report = d.dispatch(&notice(event), &audience).await;

        let items = store.feed_items();
        assert_eq!(items.len(), 3);
        assert_eq!(report.feed_delivered(), 3);
        for item in &items {
            assert!(users.contains(&item.user_id));
            assert_eq!(item.kind, NotificationKind::EventUpdate);
            assert_eq!(item.event_id, Some(event));
            assert!(!item.read);
            assert_eq!(item.title, "Event updated: Spring Concert");
        }
    }

    #[tokio::test]
    async fn test_feed_failure_is_isolated() {
        let store = Arc::new(InMemoryStore::new());
        let broken = Uuid::new_v4();
        store.fail_feed_for(broken);
        let d = dispatcher(Arc::new(MockPushGateway::new()), store.clone(), 500);
        let audience = Audience {
            user_ids: vec![Uuid::new_v4(), broken, Uuid::new_v4()],
            emails: vec!["a@depauw.edu".to_string()],
            ..Default::default()
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        assert_eq!(store.feed_items().len(), 2);
        assert_eq!(report.feed_delivered(), 2);
        assert_eq!(report.failures(), 1);
        assert_eq!(store.mail_documents().len(), 1);
    }

    #[tokio::test]
    async fn test_one_single_recipient_mail_per_email() {
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(Arc::new(MockPushGateway::new()), store.clone(), 500);
        let audience = Audience {
            emails: vec!["a@depauw.edu".to_string(), "b@depauw.edu".to_string()],
            ..Default::default()
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        let docs = store.mail_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(report.emails_enqueued(), 2);
        for doc in &docs {
            assert!(!doc.to.contains(','));
            assert_eq!(doc.subject, "Event updated: Spring Concert");
            assert!(doc.text.starts_with("New time: "));
            assert_eq!(doc.reply_to.as_deref(), Some("help@depauw.edu"));
        }
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_affect_push_or_feed() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_mail_for("a@depauw.edu");
        let push = Arc::new(MockPushGateway::new());
        let d = dispatcher(push.clone(), store.clone(), 500);
        let audience = Audience {
            push_targets: targets(3),
            user_ids: vec![Uuid::new_v4()],
            emails: vec!["a@depauw.edu".to_string(), "b@depauw.edu".to_string()],
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        assert_eq!(push.sent().len(), 1);
        assert_eq!(store.feed_items().len(), 1);
        assert_eq!(store.mail_documents().len(), 1);
        assert_eq!(report.emails_enqueued(), 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_panicked_tasks_are_reported_as_failures() {
        let store = Arc::new(InMemoryStore::new());
        let broken = Uuid::new_v4();
        store.panic_feed_for(broken);
        store.panic_mail_for("b@depauw.edu");
        let d = dispatcher(Arc::new(MockPushGateway::new()), store.clone(), 500);
        let audience = Audience {
            user_ids: vec![Uuid::new_v4(), broken],
            emails: vec!["a@depauw.edu".to_string(), "b@depauw.edu".to_string()],
            ..Default::default()
        };

        let report = d.dispatch(&notice(Uuid::new_v4()), &audience).await;

        assert_eq!(report.feed.len(), 2);
        assert_eq!(report.email.len(), 2);
        assert!(report
            .feed
            .contains(&(broken, DeliveryOutcome::Failed("task panicked".to_string()))));
        assert!(report.email.contains(&(
            "b@depauw.edu".to_string(),
            DeliveryOutcome::Failed("task panicked".to_string())
        )));
        assert_eq!(report.failures(), 2);
        assert_eq!(report.feed_delivered(), 1);
        assert_eq!(report.emails_enqueued(), 1);
    }

    #[test]
    fn test_html_body_is_escaped() {
        let d = dispatcher(
            Arc::new(MockPushGateway::new()),
            Arc::new(InMemoryStore::new()),
            500,
        );
        let mut n = notice(Uuid::new_v4());
        n.summary = "New location: <Café & Bar>.".to_string();
        let doc = d.mail_document(&n, "a@depauw.edu");
        assert!(doc.html.contains("&lt;Café &amp; Bar&gt;"));
        assert!(doc.text.contains("<Café & Bar>"));
    }
}
