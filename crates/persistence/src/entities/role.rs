//! Role ledger and claim entities.

use chrono::{DateTime, Utc};
use domain::models::{
    AllowlistEntry, AutoApproveEntry, Role, RoleRequest, RoleRequestStatus, UserClaims,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for the role claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRoleDb {
    Student,
    Organizer,
}

impl From<UserRoleDb> for Role {
    fn from(db: UserRoleDb) -> Self {
        match db {
            UserRoleDb::Student => Role::Student,
            UserRoleDb::Organizer => Role::Organizer,
        }
    }
}

impl From<Role> for UserRoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Student => UserRoleDb::Student,
            Role::Organizer => UserRoleDb::Organizer,
        }
    }
}

/// Database enum for role request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "role_request_status", rename_all = "lowercase")]
pub enum RoleRequestStatusDb {
    Pending,
    Approved,
}

impl From<RoleRequestStatusDb> for RoleRequestStatus {
    fn from(db: RoleRequestStatusDb) -> Self {
        match db {
            RoleRequestStatusDb::Pending => RoleRequestStatus::Pending,
            RoleRequestStatusDb::Approved => RoleRequestStatus::Approved,
        }
    }
}

impl From<RoleRequestStatus> for RoleRequestStatusDb {
    fn from(status: RoleRequestStatus) -> Self {
        match status {
            RoleRequestStatus::Pending => RoleRequestStatusDb::Pending,
            RoleRequestStatus::Approved => RoleRequestStatusDb::Approved,
        }
    }
}

/// Database row mapping for the org_allowlist table.
#[derive(Debug, Clone, FromRow)]
pub struct AllowlistEntity {
    pub email: String,
    pub approved_at: DateTime<Utc>,
    pub approved_by: String,
    pub source: Option<String>,
}

impl From<AllowlistEntity> for AllowlistEntry {
    fn from(entity: AllowlistEntity) -> Self {
        Self {
            email: entity.email,
            approved_at: entity.approved_at,
            approved_by: entity.approved_by,
            source: entity.source,
        }
    }
}

/// Database row mapping for the org_auto_approve table.
#[derive(Debug, Clone, FromRow)]
pub struct AutoApproveEntity {
    pub email: String,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
}

impl From<AutoApproveEntity> for AutoApproveEntry {
    fn from(entity: AutoApproveEntity) -> Self {
        Self {
            email: entity.email,
            added_at: entity.added_at,
            added_by: entity.added_by,
        }
    }
}

/// Database row mapping for the role_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRequestEntity {
    pub user_id: Uuid,
    pub email: String,
    pub reason: Option<String>,
    pub status: RoleRequestStatusDb,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<RoleRequestEntity> for RoleRequest {
    fn from(entity: RoleRequestEntity) -> Self {
        Self {
            user_id: entity.user_id,
            email: entity.email,
            reason: entity.reason,
            status: entity.status.into(),
            created_at: entity.created_at,
            approved_at: entity.approved_at,
        }
    }
}

/// A role request row plus whether the upsert inserted it.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRequestUpsertEntity {
    #[sqlx(flatten)]
    pub request: RoleRequestEntity,
    pub inserted: bool,
}

/// Database row mapping for the user_claims table.
#[derive(Debug, Clone, FromRow)]
pub struct UserClaimsEntity {
    pub user_id: Uuid,
    pub role: UserRoleDb,
    pub admin: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<UserClaimsEntity> for UserClaims {
    fn from(entity: UserClaimsEntity) -> Self {
        Self {
            user_id: entity.user_id,
            role: entity.role.into(),
            admin: entity.admin,
            updated_at: entity.updated_at,
        }
    }
}
