//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod audience;
pub mod event;
pub mod mail;
pub mod notification;
pub mod report;
pub mod role;
pub mod user;

pub use audience::{PushSubscriptionEntity, RegistrationEntity, SavedEventEntity};
pub use event::{EventEntity, EventStatusDb};
pub use mail::{MailEntity, MailStatusDb};
pub use notification::NotificationEntity;
pub use report::{ReportEntity, ReportKindDb, ReportStatusDb};
pub use role::{
    AllowlistEntity, AutoApproveEntity, RoleRequestEntity, RoleRequestStatusDb,
    RoleRequestUpsertEntity, UserClaimsEntity, UserRoleDb,
};
pub use user::UserEntity;
