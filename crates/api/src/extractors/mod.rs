//! Custom Axum extractors.

pub mod hook_secret;
pub mod user_auth;

pub use hook_secret::{HookCaller, HOOK_SECRET_HEADER};
pub use user_auth::{OptionalUserAuth, UserAuth};
