//! Shared utilities and common types for the campus events backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Session token (JWT) issuing and validation
//! - Hashing for shared-secret comparison
//! - Common validation logic (coordinates, institutional emails, event windows)
//! - Offset pagination helpers

pub mod crypto;
pub mod jwt;
pub mod pagination;
pub mod validation;
