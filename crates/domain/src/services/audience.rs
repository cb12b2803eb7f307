//! Audience resolution for event change notifications.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{PushSubscription, Registration};
use crate::services::ports::AudienceStore;

/// A device token to push to, with its owner when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub token: String,
    pub user_id: Option<Uuid>,
}

/// Targets for one event notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience {
    /// Every subscribed token, unchanged.
    pub push_targets: Vec<PushTarget>,
    /// Distinct users from subscriptions and registrations.
    pub user_ids: Vec<Uuid>,
    /// Distinct registrant emails, lower-cased.
    pub emails: Vec<String>,
}

impl Audience {
    pub fn is_empty(&self) -> bool {
        self.push_targets.is_empty() && self.user_ids.is_empty() && self.emails.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.push_targets.iter().map(|t| t.token.as_str())
    }
}

/// Builds the audience from an event's subscriptions and registrations.
///
/// Output order follows input order; duplicates keep their first position.
pub fn resolve_audience(
    subscriptions: &[PushSubscription],
    registrations: &[Registration],
) -> Audience {
    let push_targets = subscriptions
        .iter()
        .map(|s| PushTarget {
            token: s.token.clone(),
            user_id: s.user_id,
        })
        .collect();

    let mut seen_users = HashSet::new();
    let user_ids = subscriptions
        .iter()
        .filter_map(|s| s.user_id)
        .chain(registrations.iter().map(|r| r.user_id))
        .filter(|id| seen_users.insert(*id))
        .collect();

    let mut seen_emails = HashSet::new();
    let emails = registrations
        .iter()
        .filter_map(|r| r.email.as_deref())
        .map(shared::validation::normalize_email)
        .filter(|e| !e.is_empty())
        .filter(|e| seen_emails.insert(e.clone()))
        .collect();

    Audience {
        push_targets,
        user_ids,
        emails,
    }
}

/// Reads an event's audience through an [`AudienceStore`].
#[derive(Clone)]
pub struct AudienceResolver {
    store: Arc<dyn AudienceStore>,
}

impl AudienceResolver {
    pub fn new(store: Arc<dyn AudienceStore>) -> Self {
        Self { store }
    }

    /// Reads the current subscriptions and registrations for `event_id`.
    pub async fn resolve(&self, event_id: Uuid) -> Result<Audience, StoreError> {
        let subscriptions = self.store.list_push_subscriptions(event_id).await?;
        let registrations = self.store.list_registrations(event_id).await?;

        let audience = resolve_audience(&subscriptions, &registrations);

        tracing::debug!(
            event_id = %event_id,
            tokens = audience.push_targets.len(),
            users = audience.user_ids.len(),
            emails = audience.emails.len(),
            "Resolved event audience"
        );

        Ok(audience)
    }
}
