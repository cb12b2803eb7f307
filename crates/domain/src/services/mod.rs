//! Domain services for the campus events backend.
//!
//! Services contain business logic that operates on domain models. Storage
//! and delivery collaborators are reached through the traits in [`ports`].

pub mod audience;
pub mod change_detection;
pub mod dispatcher;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod pipeline;
pub mod ports;
pub mod push;
pub mod roles;

pub use audience::{resolve_audience, Audience, AudienceResolver, PushTarget};
pub use change_detection::{detect_changes, summarize, ChangeSet, ChangeTag, EventSnapshot};
pub use dispatcher::{
    ChangeNotice, DeliveryDispatcher, DeliveryOutcome, DispatchConfig, DispatchReport, PushReport,
};
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryStore;
pub use pipeline::{NotificationPipeline, PipelineConfig, PipelineOutcome};
pub use ports::{AudienceStore, ClaimStore, FeedStore, MailQueue, RoleLedger};
pub use push::{
    MockPushGateway, MulticastMessage, MulticastResponse, PushError, PushGateway, TokenOutcome,
    MAX_MULTICAST_TOKENS,
};
pub use roles::{
    ApprovalOutcome, AutoApproval, Caller, OrganizerApproval, OrganizerRequestOutcome, RoleAuthority,
    RoleError, RolePolicy, SignInResolution,
};
