//! Organizer role ledger models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role claim resolved for a signed-in user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Organizer,
}

impl Role {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Organizer => "organizer",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "organizer" => Some(Role::Organizer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a user stands in the organizer approval flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleState {
    /// Never signed in; no claim recorded.
    Unresolved,
    Student,
    /// Student with an open role request.
    OrganizerPending,
    Organizer,
}

/// Allowlist entry granting the organizer role. Keyed by lower-cased email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistEntry {
    pub email: String,
    pub approved_at: DateTime<Utc>,
    /// Approving admin's user id, or `auto`.
    pub approved_by: String,
    /// Origin of an automatic approval, e.g. `role_requests`.
    pub source: Option<String>,
}

/// Marks an email whose role requests are approved without admin action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoApproveEntry {
    pub email: String,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
}

/// Status of a role request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleRequestStatus {
    Pending,
    Approved,
}

impl RoleRequestStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleRequestStatus::Pending => "pending",
            RoleRequestStatus::Approved => "approved",
        }
    }

    /// Parses from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RoleRequestStatus::Pending),
            "approved" => Some(RoleRequestStatus::Approved),
            _ => None,
        }
    }
}

/// A user's request for the organizer role. One per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub user_id: Uuid,
    pub email: String,
    pub reason: Option<String>,
    pub status: RoleRequestStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Result of writing a pending role request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequestWrite {
    /// No request existed; a pending one was inserted.
    Created(RoleRequest),
    /// A non-pending request was reopened as pending.
    Reopened(RoleRequest),
    /// A pending request already existed and was left untouched.
    AlreadyPending(RoleRequest),
}

impl RoleRequestWrite {
    pub fn request(&self) -> &RoleRequest {
        match self {
            RoleRequestWrite::Created(r)
            | RoleRequestWrite::Reopened(r)
            | RoleRequestWrite::AlreadyPending(r) => r,
        }
    }
}

/// Request payload for asking to become an organizer.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequestRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Admin request to grant or revoke organizer status for an email.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerApprovalRequest {
    #[validate(length(min = 1, max = 320, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    pub approve: bool,
    #[serde(default)]
    pub auto: bool,
}

/// Response for the caller's role state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStateResponse {
    pub user_id: Uuid,
    pub email: String,
    pub state: RoleState,
    pub admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RoleRequest>,
}

/// Response to an admin's grant or revoke.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerApprovalResponse {
    pub email: String,
    pub approve: bool,
    pub auto: bool,
    /// True when an existing account's claim was rewritten immediately.
    pub claim_refreshed: bool,
}

/// Query parameters for the admin role request queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRoleRequestsQuery {
    pub status: Option<RoleRequestStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    shared::pagination::DEFAULT_PER_PAGE
}

impl ListRoleRequestsQuery {
    pub fn page_request(&self) -> shared::pagination::PageRequest {
        shared::pagination::PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
        .normalized()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRoleRequestsResponse {
    pub requests: Vec<RoleRequest>,
    pub pagination: shared::pagination::PageInfo,
}
