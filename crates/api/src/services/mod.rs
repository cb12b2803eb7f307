//! External service integrations.

pub mod email;
pub mod fcm;

pub use email::{EmailError, EmailMessage, EmailService};
pub use fcm::{FcmError, FcmPushGateway};
