//! Domain models for the campus events backend.

pub mod audience;
pub mod event;
pub mod mail;
pub mod notification;
pub mod report;
pub mod role;
pub mod user;

pub use audience::{PushSubscription, Registration, SavedEvent};
pub use event::{Event, EventStatus};
pub use mail::{MailDocument, MailStatus, QueuedMail};
pub use notification::{FeedNotification, NewFeedNotification, NotificationKind};
pub use report::{Report, ReportKind, ReportStatus};
pub use role::{
    AllowlistEntry, AutoApproveEntry, Role, RoleRequest, RoleRequestStatus, RoleRequestWrite,
    RoleState,
};
pub use user::{UserClaims, UserProfile};
