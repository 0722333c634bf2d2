//! # notekeep-core
//!
//! Core types, traits, and request validation for the notekeep service.
//!
//! This crate provides the foundational data structures and the repository
//! contract that the store (`notekeep-db`), the HTTP server (`notekeep-api`)
//! and the client (`notekeep-client`) share.

pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, FieldError, Result};
pub use models::*;
pub use traits::*;

/// Generate a new time-ordered note identifier.
///
/// UUIDv7 embeds a millisecond timestamp plus random bits, so identifiers
/// are never reused after deletion.
pub fn new_v7() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
