//! Authentication request handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;
use storefront_core::auth::identity::Identity;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, LoginRequest, LogoutResponse, RegisterRequest};
use crate::services::auth::{self, Session};
use crate::services::cookies::{TOKEN_COOKIE, clear_session_cookie, session_cookie};

fn with_session_cookie(state: &AppState, jar: CookieJar, session: &Session) -> CookieJar {
    jar.add(session_cookie(
        &session.token.token,
        state.codec.validity().num_seconds(),
        state.config.secure_cookies,
    ))
}

/// Unwraps a JSON body, refusing with `AuthDisabled` first so the mode wins
/// over a malformed or missing body.
fn accept_body<T>(state: &AppState, body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    auth::ensure_enabled(state)?;
    match body {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    }
}

/// `POST /api/auth/register`: create an account; sets the session cookie.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthUser>)> {
    let body = accept_body(&state, body)?;
    let session = auth::register(&state, &body.email, &body.password).await?;
    let jar = with_session_cookie(&state, jar, &session);
    Ok((StatusCode::CREATED, jar, Json(session.user)))
}

/// `POST /api/auth/login`: authenticate with email + password; sets the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthUser>)> {
    let body = accept_body(&state, body)?;
    let session = auth::login(&state, &body.email, &body.password).await?;
    let jar = with_session_cookie(&state, jar, &session);
    Ok((jar, Json(session.user)))
}

/// `POST /api/auth/logout`: revoke the presented token and clear the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let token = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string());
    let resp = auth::logout(&state, token.as_deref()).await?;
    let jar = jar.add(clear_session_cookie(state.config.secure_cookies));
    Ok((jar, Json(resp)))
}

/// `GET /api/auth/profile`: public fields of the signed-in user.
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<AuthUser>> {
    let user = auth::current_user(&state, &identity).await?;
    Ok(Json(user))
}
