//! Domain layer for the campus events backend.
//!
//! This crate contains:
//! - Domain models (events, audience records, feed items, role ledger)
//! - The notification pipeline (change detection, audience resolution,
//!   multi-channel dispatch) and the organizer role authority
//! - Collaborator traits the persistence and API layers implement
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
