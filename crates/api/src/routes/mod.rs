//! HTTP route handlers.

pub mod admin;
pub mod audience;
pub mod events;
pub mod health;
pub mod hooks;
pub mod me;
pub mod notifications;
pub mod reports;
