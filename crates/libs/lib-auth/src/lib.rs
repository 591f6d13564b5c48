//! # Authentication Library
//!
//! Password hashing and bearer-token (JWT) issue and verification.
//!
//! This crate is the credential verifier the relay depends on: it maps an
//! opaque bearer token to the stable subject id embedded in it, or fails.
//! It performs no store lookups; resolving the subject to a live user is the
//! caller's job.

pub mod pwd;
pub mod token;

use thiserror::Error;

// Re-export commonly used types
pub use pwd::{hash_password, verify_password};
pub use token::{issue_token, verify_token, Claims};

/// Errors produced by credential handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password fails the minimum-strength policy.
    #[error("password must be at least 8 characters long")]
    PasswordTooShort,

    /// Hashing or hash-parsing failed.
    #[error("password hash error: {0}")]
    Hash(String),

    /// Token signature valid but past its expiry.
    #[error("credential expired")]
    Expired,

    /// Token missing, malformed, or signature mismatch.
    #[error("credential invalid: {0}")]
    Invalid(String),
}
