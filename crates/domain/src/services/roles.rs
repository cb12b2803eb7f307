//! Organizer role authority.
//!
//! A user's role is derived from the ledger on every sign-in: an
//! institutional email with an allowlist or auto-approve entry is an
//! organizer, everyone else is a student. The derived role is mirrored into
//! the identity provider's claims, but privileged checks go back to the
//! ledger (organizer) or the stored claim set (admin) rather than trusting
//! the session.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    AllowlistEntry, AutoApproveEntry, Role, RoleRequest, RoleRequestStatus, RoleRequestWrite,
    RoleState,
};
use crate::services::ports::{ClaimStore, RoleLedger};
use shared::validation::{is_institutional_email, normalize_email};

/// `approved_by` value for approvals made without an admin.
pub const AUTO_APPROVER: &str = "auto";

/// `source` value for approvals triggered by a role request.
pub const ROLE_REQUEST_SOURCE: &str = "role_requests";

/// Errors raised by role operations.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An authenticated caller as seen by privileged operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub email: String,
}

/// Role policy settings.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    /// Only emails on this domain can hold the organizer role.
    pub institution_domain: String,
}

/// Result of a sign-in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInResolution {
    pub role: Role,
    pub admin: bool,
}

/// Result of asking to become an organizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizerRequestOutcome {
    /// The ledger already grants the role; no request was written.
    AlreadyOrganizer,
    /// A pending request exists and was left as is.
    AlreadyPending(RoleRequest),
    /// A new pending request awaits an admin.
    Pending(RoleRequest),
    /// The request was approved immediately from the auto-approve ledger.
    AutoApproved(RoleRequest),
}

/// Result of processing a newly opened role request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoApproval {
    Approved,
    LeftPending,
    /// Non-institutional email; nothing written.
    Ignored,
}

/// An admin's grant or revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerApproval {
    pub email: String,
    pub approve: bool,
    pub auto: bool,
}

/// Result of an admin's grant or revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub email: String,
    pub approve: bool,
    pub auto: bool,
    /// Set when an existing account's claim was rewritten immediately.
    pub refreshed_user: Option<Uuid>,
}

/// Resolves and mutates organizer status.
#[derive(Clone)]
pub struct RoleAuthority {
    ledger: Arc<dyn RoleLedger>,
    claims: Arc<dyn ClaimStore>,
    policy: RolePolicy,
}

impl RoleAuthority {
    pub fn new(ledger: Arc<dyn RoleLedger>, claims: Arc<dyn ClaimStore>, policy: RolePolicy) -> Self {
        Self {
            ledger,
            claims,
            policy,
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    fn is_institutional(&self, email: &str) -> bool {
        is_institutional_email(email, &self.policy.institution_domain)
    }

    /// Derives the role for `email` from the ledger.
    pub async fn resolve_role(&self, email: &str) -> Result<Role, RoleError> {
        let email = normalize_email(email);
        if !self.is_institutional(&email) {
            return Ok(Role::Student);
        }

        if self.ledger.find_allowlist_entry(&email).await?.is_some() {
            return Ok(Role::Organizer);
        }
        if self.ledger.find_auto_approve_entry(&email).await?.is_some() {
            return Ok(Role::Organizer);
        }
        Ok(Role::Student)
    }

    /// Resolves the role before a session is issued and writes the claim.
    pub async fn resolve_on_sign_in(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<SignInResolution, RoleError> {
        let role = self.resolve_role(email).await?;
        self.claims.set_role_claim(user_id, role).await?;

        let admin = self
            .claims
            .find_claims(user_id)
            .await?
            .map(|c| c.admin)
            .unwrap_or(false);

        tracing::info!(
            user_id = %user_id,
            role = %role,
            admin = admin,
            "Resolved role on sign-in"
        );

        Ok(SignInResolution { role, admin })
    }

    /// Where `caller` stands in the approval flow.
    pub async fn role_state(&self, caller: &Caller) -> Result<RoleState, RoleError> {
        if self.claims.find_claims(caller.user_id).await?.is_none() {
            return Ok(RoleState::Unresolved);
        }

        if self.resolve_role(&caller.email).await? == Role::Organizer {
            return Ok(RoleState::Organizer);
        }

        let pending = self
            .ledger
            .find_role_request(caller.user_id)
            .await?
            .is_some_and(|r| r.status == RoleRequestStatus::Pending);

        Ok(if pending {
            RoleState::OrganizerPending
        } else {
            RoleState::Student
        })
    }

    /// Records the caller's wish to become an organizer.
    ///
    /// A newly opened request goes straight through auto-approval. The
    /// caller's current session keeps its student role either way.
    pub async fn request_organizer(
        &self,
        caller: &Caller,
        reason: Option<&str>,
    ) -> Result<OrganizerRequestOutcome, RoleError> {
        let email = normalize_email(&caller.email);

        if self.resolve_role(&email).await? == Role::Organizer {
            // The session may predate the ledger entry.
            self.claims
                .set_role_claim(caller.user_id, Role::Organizer)
                .await?;
            return Ok(OrganizerRequestOutcome::AlreadyOrganizer);
        }

        let write = self
            .ledger
            .open_role_request(caller.user_id, &email, reason)
            .await?;

        let request = match write {
            RoleRequestWrite::AlreadyPending(request) => {
                return Ok(OrganizerRequestOutcome::AlreadyPending(request))
            }
            RoleRequestWrite::Created(request) | RoleRequestWrite::Reopened(request) => request,
        };

        tracing::info!(user_id = %caller.user_id, "Opened organizer role request");

        match self.on_role_request_created(&request).await? {
            AutoApproval::Approved => {
                let approved = self
                    .ledger
                    .find_role_request(caller.user_id)
                    .await?
                    .unwrap_or(request);
                Ok(OrganizerRequestOutcome::AutoApproved(approved))
            }
            AutoApproval::LeftPending | AutoApproval::Ignored => {
                Ok(OrganizerRequestOutcome::Pending(request))
            }
        }
    }

    /// Approves a newly opened request when its email is on the
    /// auto-approve ledger.
    pub async fn on_role_request_created(
        &self,
        request: &RoleRequest,
    ) -> Result<AutoApproval, RoleError> {
        let email = normalize_email(&request.email);
        if !self.is_institutional(&email) {
            return Ok(AutoApproval::Ignored);
        }

        if self.ledger.find_auto_approve_entry(&email).await?.is_none() {
            return Ok(AutoApproval::LeftPending);
        }

        self.ledger
            .upsert_allowlist_entry(&AllowlistEntry {
                email: email.clone(),
                approved_at: Utc::now(),
                approved_by: AUTO_APPROVER.to_string(),
                source: Some(ROLE_REQUEST_SOURCE.to_string()),
            })
            .await?;

        self.refresh_claim(&email).await?;
        self.ledger
            .mark_role_request_approved(request.user_id)
            .await?;

        tracing::info!(user_id = %request.user_id, "Auto-approved organizer role request");

        Ok(AutoApproval::Approved)
    }

    /// Grants or revokes organizer status for an email. Admin only.
    ///
    /// Input is validated before anything is written.
    pub async fn set_organizer_approval(
        &self,
        caller: Option<&Caller>,
        input: OrganizerApproval,
    ) -> Result<ApprovalOutcome, RoleError> {
        let caller = self.require_admin(caller).await?;

        let email = normalize_email(&input.email);
        if !self.is_institutional(&email) {
            return Err(RoleError::InvalidArgument(format!(
                "A valid @{} email is required",
                self.policy.institution_domain
            )));
        }

        let approved_by = caller.user_id.to_string();
        if input.approve {
            let now = Utc::now();
            self.ledger
                .upsert_allowlist_entry(&AllowlistEntry {
                    email: email.clone(),
                    approved_at: now,
                    approved_by: approved_by.clone(),
                    source: None,
                })
                .await?;
            if input.auto {
                self.ledger
                    .upsert_auto_approve_entry(&AutoApproveEntry {
                        email: email.clone(),
                        added_at: now,
                        added_by: approved_by,
                    })
                    .await?;
            }
        } else {
            self.ledger.delete_allowlist_entry(&email).await?;
            if input.auto {
                self.ledger.delete_auto_approve_entry(&email).await?;
            }
        }

        let refreshed_user = self.refresh_claim(&email).await?;

        tracing::info!(
            admin_id = %caller.user_id,
            approve = input.approve,
            auto = input.auto,
            claim_refreshed = refreshed_user.is_some(),
            "Updated organizer approval"
        );

        Ok(ApprovalOutcome {
            email,
            approve: input.approve,
            auto: input.auto,
            refreshed_user,
        })
    }

    /// Re-derives and writes the claim for an existing account. Accounts
    /// that do not exist yet are resolved at their first sign-in.
    async fn refresh_claim(&self, email: &str) -> Result<Option<Uuid>, RoleError> {
        let Some(user_id) = self.claims.find_user_id_by_email(email).await? else {
            return Ok(None);
        };
        let role = self.resolve_role(email).await?;
        self.claims.set_role_claim(user_id, role).await?;
        Ok(Some(user_id))
    }

    /// Fails unless the ledger currently grants `caller` the organizer role.
    pub async fn require_organizer(&self, caller: &Caller) -> Result<(), RoleError> {
        match self.resolve_role(&caller.email).await? {
            Role::Organizer => Ok(()),
            Role::Student => Err(RoleError::PermissionDenied(
                "Organizer role required".to_string(),
            )),
        }
    }

    /// Whether the stored claims mark `user_id` as admin.
    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, RoleError> {
        Ok(self
            .claims
            .find_claims(user_id)
            .await?
            .is_some_and(|c| c.admin))
    }

    /// The caller's most recent role request, if any.
    pub async fn role_request(&self, user_id: Uuid) -> Result<Option<RoleRequest>, RoleError> {
        Ok(self.ledger.find_role_request(user_id).await?)
    }

    /// Fails unless `caller` is present and holds the stored admin claim.
    pub async fn require_admin<'a>(
        &self,
        caller: Option<&'a Caller>,
    ) -> Result<&'a Caller, RoleError> {
        let caller = caller.ok_or(RoleError::Unauthenticated)?;
        if self.is_admin(caller.user_id).await? {
            Ok(caller)
        } else {
            Err(RoleError::PermissionDenied("Admin only".to_string()))
        }
    }
}
