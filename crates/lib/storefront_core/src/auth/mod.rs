//! Authentication and session logic.
//!
//! Provides password hashing, the session token codec, the credential and
//! revocation stores, per-request identity resolution, and the reaper that
//! purges stale revocation records.

pub mod credentials;
pub mod identity;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod reaper;
pub mod revocation;
pub mod validation;

use thiserror::Error;

/// Identity used for every request while authentication is disabled.
///
/// Also the id of the fixture user created by [`crate::fixtures::seed_default_user`].
pub const DEFAULT_USER_ID: &str = "f3b4e2a1-9c8d-4e7f-a6b5-3c2d1e0f9a8b";

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Process-wide switch between real accounts and the fixed default identity.
///
/// Read once at startup and passed to every component that branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Enabled,
    Disabled,
}

impl AuthMode {
    /// Map the `AUTH_ENABLED` flag onto a mode.
    pub fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}
