//! Persistence layer for the campus events backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the store traits the domain
//!   services depend on
//! - Query metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
