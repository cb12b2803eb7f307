//! Collaborator traits implemented by the persistence and API layers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    AllowlistEntry, AutoApproveEntry, MailDocument, NewFeedNotification, PushSubscription,
    Registration, Role, RoleRequest, RoleRequestWrite, UserClaims,
};

/// Read access to an event's audience, plus token pruning.
#[async_trait]
pub trait AudienceStore: Send + Sync {
    async fn list_push_subscriptions(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<PushSubscription>, StoreError>;

    async fn list_registrations(&self, event_id: Uuid) -> Result<Vec<Registration>, StoreError>;

    /// Deletes the subscription for `(event_id, token)`. Returns whether a
    /// row was removed.
    async fn delete_push_subscription(
        &self,
        event_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError>;
}

/// Append-only writer for in-app feed items.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn insert_notification(&self, notification: NewFeedNotification)
        -> Result<Uuid, StoreError>;
}

/// Transactional-email queue. Delivery and retries belong to the queue.
#[async_trait]
pub trait MailQueue: Send + Sync {
    async fn enqueue(&self, document: MailDocument) -> Result<Uuid, StoreError>;
}

/// Organizer allowlist, auto-approve ledger and role requests.
///
/// Emails passed to this trait are already normalized (trimmed, lower-cased).
#[async_trait]
pub trait RoleLedger: Send + Sync {
    async fn find_allowlist_entry(&self, email: &str)
        -> Result<Option<AllowlistEntry>, StoreError>;

    async fn find_auto_approve_entry(
        &self,
        email: &str,
    ) -> Result<Option<AutoApproveEntry>, StoreError>;

    async fn upsert_allowlist_entry(&self, entry: &AllowlistEntry) -> Result<(), StoreError>;

    async fn delete_allowlist_entry(&self, email: &str) -> Result<bool, StoreError>;

    async fn upsert_auto_approve_entry(&self, entry: &AutoApproveEntry)
        -> Result<(), StoreError>;

    async fn delete_auto_approve_entry(&self, email: &str) -> Result<bool, StoreError>;

    async fn find_role_request(&self, user_id: Uuid) -> Result<Option<RoleRequest>, StoreError>;

    /// Creates a pending request, or reopens a non-pending one. A request
    /// that is already pending is returned unchanged.
    async fn open_role_request(
        &self,
        user_id: Uuid,
        email: &str,
        reason: Option<&str>,
    ) -> Result<RoleRequestWrite, StoreError>;

    async fn mark_role_request_approved(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Claims held by the identity provider.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Writes the role claim, keeping any admin claim untouched.
    async fn set_role_claim(&self, user_id: Uuid, role: Role) -> Result<(), StoreError>;

    async fn find_claims(&self, user_id: Uuid) -> Result<Option<UserClaims>, StoreError>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError>;
}
