//! Authentication service: register/login/logout/profile flows delegating to
//! `storefront_core::auth`.
//!
//! Every flow refuses with `AuthDisabled` before touching a store when the
//! process runs with authentication turned off. Gating (must / must not be
//! signed in) happens in middleware before these run.

use storefront_core::auth::identity::Identity;
use storefront_core::auth::password::{hash_password, verify_password};
use storefront_core::auth::validation::{validate_login, validate_registration};
use storefront_core::models::auth::{IssuedToken, User};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, LogoutResponse};

/// A user together with the token the transport should carry for them.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: AuthUser,
    pub token: IssuedToken,
}

pub(crate) fn ensure_enabled(state: &AppState) -> AppResult<()> {
    if state.config.auth_mode.is_enabled() {
        Ok(())
    } else {
        Err(AppError::AuthDisabled)
    }
}

fn public_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id.clone(),
        email: user.email.clone(),
    }
}

fn start_session(state: &AppState, user: &User) -> AppResult<Session> {
    let token = state.codec.issue(&user.id, &user.email)?;
    Ok(Session {
        user: public_user(user),
        token,
    })
}

/// Create an account and sign it in.
pub async fn register(state: &AppState, email: &str, password: &str) -> AppResult<Session> {
    ensure_enabled(state)?;
    let email = validate_registration(email, password)?;

    if state.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password(password)?;
    // A concurrent registration that wins the insert surfaces as DuplicateEmail.
    let user = state.users.create_user(&email, &password_hash).await?;
    info!(user_id = %user.id, "registered user");

    start_session(state, &user)
}

/// Authenticate with email + password.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<Session> {
    ensure_enabled(state)?;
    let email = validate_login(email, password)?;

    let Some(record) = state.users.find_user_by_email(&email).await? else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &record.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %record.user.id, "user logged in");
    start_session(state, &record.user)
}

/// Revoke the presented token until its own expiry.
///
/// A token whose expiry cannot be read is not revoked; the caller still clears
/// the cookie and the logout succeeds.
pub async fn logout(state: &AppState, token: Option<&str>) -> AppResult<LogoutResponse> {
    ensure_enabled(state)?;

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        match state.codec.decode_expiry(token) {
            Some(expires_at) => {
                state.revocations.revoke(token, expires_at).await?;
                info!(%expires_at, "session token revoked");
            }
            None => warn!("logout token has no readable expiry, skipping revocation"),
        }
    }

    Ok(LogoutResponse {
        message: "Logged out successfully".to_string(),
    })
}

/// Public fields of the user behind the resolved identity.
pub async fn current_user(state: &AppState, identity: &Identity) -> AppResult<AuthUser> {
    ensure_enabled(state)?;
    let user_id = identity.user_id().ok_or(AppError::Unauthenticated)?;
    let user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(public_user(&user))
}
