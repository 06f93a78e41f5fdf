//! Authentication middleware: cookie identity resolution and route gating.
//!
//! `resolve_identity` runs on every request and always inserts an [`Identity`]
//! into request extensions; it never rejects. `require_auth` and
//! `require_anonymous` read that identity and reject where appropriate. Both
//! gates pass everything while authentication is disabled.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use storefront_core::auth::AuthMode;
use storefront_core::auth::identity::{self, Identity};

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::TOKEN_COOKIE;

/// Axum middleware: reads the session cookie and resolves the request identity.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string());
    let identity = identity::resolve_identity(
        state.config.auth_mode,
        token.as_deref(),
        &state.codec,
        state.revocations.as_ref(),
    )
    .await;
    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Must be signed in (when authentication is enabled).
pub fn check_authenticated(mode: AuthMode, identity: &Identity) -> Result<(), AppError> {
    if mode.is_enabled() && !identity.is_resolved() {
        return Err(AppError::Unauthenticated);
    }
    Ok(())
}

/// Must not be signed in (when authentication is enabled).
pub fn check_anonymous(mode: AuthMode, identity: &Identity) -> Result<(), AppError> {
    if mode.is_enabled() && identity.is_resolved() {
        return Err(AppError::AlreadyAuthenticated);
    }
    Ok(())
}

fn request_identity(request: &Request) -> Identity {
    request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or(Identity::Unresolved)
}

/// Axum middleware: rejects with `Unauthenticated` when no identity resolved.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_authenticated(state.config.auth_mode, &request_identity(&request))?;
    Ok(next.run(request).await)
}

/// Axum middleware: rejects with `AlreadyAuthenticated` when an identity resolved.
pub async fn require_anonymous(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_anonymous(state.config.auth_mode, &request_identity(&request))?;
    Ok(next.run(request).await)
}
