//! In-memory implementations of the store traits.
//!
//! Compiled for tests and behind the `test-support` feature. Individual
//! writes can be made to fail, or to panic, to exercise partial-failure
//! paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    AllowlistEntry, AutoApproveEntry, FeedNotification, MailDocument, NewFeedNotification,
    PushSubscription, Registration, Role, RoleRequest, RoleRequestStatus, RoleRequestWrite,
    UserClaims,
};
use crate::services::ports::{AudienceStore, ClaimStore, FeedStore, MailQueue, RoleLedger};

#[derive(Debug, Default)]
struct MemoryState {
    subscriptions: Vec<PushSubscription>,
    registrations: Vec<Registration>,
    feed: Vec<FeedNotification>,
    mail: Vec<(Uuid, MailDocument)>,
    allowlist: HashMap<String, AllowlistEntry>,
    auto_approve: HashMap<String, AutoApproveEntry>,
    role_requests: HashMap<Uuid, RoleRequest>,
    claims: HashMap<Uuid, UserClaims>,
    users: HashMap<String, Uuid>,
    failing_feed_users: HashSet<Uuid>,
    failing_mail: HashSet<String>,
    panicking_feed_users: HashSet<Uuid>,
    panicking_mail: HashSet<String>,
    audience_unavailable: bool,
}

/// A single store backing every collaborator trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds or overwrites the subscription for `(event_id, token)`.
    pub fn add_push_subscription(
        &self,
        event_id: Uuid,
        token: &str,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) {
        let mut state = self.state();
        state
            .subscriptions
            .retain(|s| !(s.event_id == event_id && s.token == token));
        state.subscriptions.push(PushSubscription {
            event_id,
            token: token.to_string(),
            user_id,
            email: email.map(str::to_string),
            subscribed_at: Utc::now(),
        });
    }

    pub fn add_registration(&self, event_id: Uuid, user_id: Uuid, email: Option<&str>) {
        let mut state = self.state();
        state
            .registrations
            .retain(|r| !(r.event_id == event_id && r.user_id == user_id));
        state.registrations.push(Registration {
            event_id,
            user_id,
            email: email.map(str::to_string),
            name: None,
            registered_at: Utc::now(),
        });
    }

    /// Registers a known user account.
    pub fn add_user(&self, user_id: Uuid, email: &str) {
        self.state()
            .users
            .insert(shared::validation::normalize_email(email), user_id);
    }

    /// Sets the admin claim for `user_id`.
    pub fn grant_admin(&self, user_id: Uuid) {
        let mut state = self.state();
        let claims = state.claims.entry(user_id).or_insert_with(|| UserClaims {
            user_id,
            role: Role::Student,
            admin: false,
            updated_at: Utc::now(),
        });
        claims.admin = true;
        claims.updated_at = Utc::now();
    }

    pub fn fail_feed_for(&self, user_id: Uuid) {
        self.state().failing_feed_users.insert(user_id);
    }

    pub fn fail_mail_for(&self, email: &str) {
        self.state().failing_mail.insert(email.to_string());
    }

    /// Makes the feed write for `user_id` panic instead of returning.
    pub fn panic_feed_for(&self, user_id: Uuid) {
        self.state().panicking_feed_users.insert(user_id);
    }

    pub fn panic_mail_for(&self, email: &str) {
        self.state().panicking_mail.insert(email.to_string());
    }

    pub fn set_audience_unavailable(&self, unavailable: bool) {
        self.state().audience_unavailable = unavailable;
    }

    pub fn push_tokens(&self, event_id: Uuid) -> Vec<String> {
        self.state()
            .subscriptions
            .iter()
            .filter(|s| s.event_id == event_id)
            .map(|s| s.token.clone())
            .collect()
    }

    pub fn feed_items(&self) -> Vec<FeedNotification> {
        self.state().feed.clone()
    }

    pub fn mail_documents(&self) -> Vec<MailDocument> {
        self.state().mail.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn claims(&self, user_id: Uuid) -> Option<UserClaims> {
        self.state().claims.get(&user_id).cloned()
    }

    pub fn allowlist_entry(&self, email: &str) -> Option<AllowlistEntry> {
        self.state().allowlist.get(email).cloned()
    }

    pub fn auto_approve_entry(&self, email: &str) -> Option<AutoApproveEntry> {
        self.state().auto_approve.get(email).cloned()
    }

    pub fn role_request(&self, user_id: Uuid) -> Option<RoleRequest> {
        self.state().role_requests.get(&user_id).cloned()
    }
}

#[async_trait]
impl AudienceStore for InMemoryStore {
    async fn list_push_subscriptions(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        let state = self.state();
        if state.audience_unavailable {
            return Err(StoreError::Unavailable("audience reads disabled".to_string()));
        }
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        let state = self.state();
        if state.audience_unavailable {
            return Err(StoreError::Unavailable("audience reads disabled".to_string()));
        }
        Ok(state
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn delete_push_subscription(
        &self,
        event_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|s| !(s.event_id == event_id && s.token == token));
        Ok(state.subscriptions.len() < before)
    }
}

#[async_trait]
impl FeedStore for InMemoryStore {
    async fn insert_notification(
        &self,
        notification: NewFeedNotification,
    ) -> Result<Uuid, StoreError> {
        if self
            .state()
            .panicking_feed_users
            .contains(&notification.user_id)
        {
            panic!("feed write panicked for {}", notification.user_id);
        }
        let mut state = self.state();
        if state.failing_feed_users.contains(&notification.user_id) {
            return Err(StoreError::Unavailable(format!(
                "feed write failed for {}",
                notification.user_id
            )));
        }
        let id = Uuid::new_v4();
        state.feed.push(FeedNotification {
            id,
            user_id: notification.user_id,
            event_id: notification.event_id,
            title: notification.title,
            body: notification.body,
            link: notification.link,
            kind: notification.kind,
            read: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

#[async_trait]
impl MailQueue for InMemoryStore {
    async fn enqueue(&self, document: MailDocument) -> Result<Uuid, StoreError> {
        if self.state().panicking_mail.contains(&document.to) {
            panic!("mail enqueue panicked for {}", document.to);
        }
        let mut state = self.state();
        if state.failing_mail.contains(&document.to) {
            return Err(StoreError::Unavailable(format!(
                "mail enqueue failed for {}",
                document.to
            )));
        }
        let id = Uuid::new_v4();
        state.mail.push((id, document));
        Ok(id)
    }
}

#[async_trait]
impl RoleLedger for InMemoryStore {
    async fn find_allowlist_entry(
        &self,
        email: &str,
    ) -> Result<Option<AllowlistEntry>, StoreError> {
        Ok(self.state().allowlist.get(email).cloned())
    }

    async fn find_auto_approve_entry(
        &self,
        email: &str,
    ) -> Result<Option<AutoApproveEntry>, StoreError> {
        Ok(self.state().auto_approve.get(email).cloned())
    }

    async fn upsert_allowlist_entry(&self, entry: &AllowlistEntry) -> Result<(), StoreError> {
        self.state()
            .allowlist
            .insert(entry.email.clone(), entry.clone());
        Ok(())
    }

    async fn delete_allowlist_entry(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.state().allowlist.remove(email).is_some())
    }

    async fn upsert_auto_approve_entry(
        &self,
        entry: &AutoApproveEntry,
    ) -> Result<(), StoreError> {
        self.state()
            .auto_approve
            .insert(entry.email.clone(), entry.clone());
        Ok(())
    }

    async fn delete_auto_approve_entry(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.state().auto_approve.remove(email).is_some())
    }

    async fn find_role_request(&self, user_id: Uuid) -> Result<Option<RoleRequest>, StoreError> {
        Ok(self.state().role_requests.get(&user_id).cloned())
    }

    async fn open_role_request(
        &self,
        user_id: Uuid,
        email: &str,
        reason: Option<&str>,
    ) -> Result<RoleRequestWrite, StoreError> {
        let mut state = self.state();
        let fresh = RoleRequest {
            user_id,
            email: email.to_string(),
            reason: reason.map(str::to_string),
            status: RoleRequestStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
        };

        match state.role_requests.get(&user_id).cloned() {
            Some(existing) if existing.status == RoleRequestStatus::Pending => {
                Ok(RoleRequestWrite::AlreadyPending(existing))
            }
            Some(_) => {
                state.role_requests.insert(user_id, fresh.clone());
                Ok(RoleRequestWrite::Reopened(fresh))
            }
            None => {
                state.role_requests.insert(user_id, fresh.clone());
                Ok(RoleRequestWrite::Created(fresh))
            }
        }
    }

    async fn mark_role_request_approved(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state();
        match state.role_requests.get_mut(&user_id) {
            Some(request) => {
                request.status = RoleRequestStatus::Approved;
                request.approved_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ClaimStore for InMemoryStore {
    async fn set_role_claim(&self, user_id: Uuid, role: Role) -> Result<(), StoreError> {
        let mut state = self.state();
        let now = Utc::now();
        state
            .claims
            .entry(user_id)
            .and_modify(|c| {
                c.role = role;
                c.updated_at = now;
            })
            .or_insert(UserClaims {
                user_id,
                role,
                admin: false,
                updated_at: now,
            });
        Ok(())
    }

    async fn find_claims(&self, user_id: Uuid) -> Result<Option<UserClaims>, StoreError> {
        Ok(self.state().claims.get(&user_id).cloned())
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(self.state().users.get(email).copied())
    }
}
