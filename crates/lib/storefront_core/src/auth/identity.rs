//! Per-request identity resolution.
//!
//! Resolution never fails. A missing, revoked, malformed, badly signed or
//! expired credential all collapse to [`Identity::Unresolved`]; gating decides
//! what that means for the route.

use tracing::{debug, error};

use super::jwt::TokenCodec;
use super::revocation::RevocationStore;
use super::{AuthMode, DEFAULT_USER_ID};

/// Who the current request acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Subject user ID taken from a valid token, or the default identity.
    Resolved(String),
    Unresolved,
}

impl Identity {
    /// The fixed identity used while authentication is disabled.
    pub fn default_user() -> Self {
        Self::Resolved(DEFAULT_USER_ID.to_string())
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Resolve the identity for one request from its presented token, if any.
///
/// The revocation check runs before signature verification; a store failure
/// there is logged and treated as unresolved.
pub async fn resolve_identity(
    mode: AuthMode,
    token: Option<&str>,
    codec: &TokenCodec,
    revocations: &dyn RevocationStore,
) -> Identity {
    if !mode.is_enabled() {
        return Identity::default_user();
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Identity::Unresolved;
    };

    match revocations.is_revoked(token).await {
        Ok(false) => {}
        Ok(true) => {
            debug!("presented token is revoked");
            return Identity::Unresolved;
        }
        Err(e) => {
            error!(error = %e, "revocation lookup failed");
            return Identity::Unresolved;
        }
    }

    match codec.verify(token) {
        Some(claims) => Identity::Resolved(claims.sub),
        None => {
            debug!("presented token failed verification");
            Identity::Unresolved
        }
    }
}
