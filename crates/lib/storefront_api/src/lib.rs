//! # storefront_api
//!
//! HTTP API library for storefront authentication and sessions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use storefront_core::auth::credentials::CredentialStore;
use storefront_core::auth::jwt::TokenCodec;
use storefront_core::auth::revocation::RevocationStore;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::auth;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// Session token codec keyed by `config.jwt_secret`.
    pub codec: TokenCodec,
    /// User records.
    pub users: Arc<dyn CredentialStore>,
    /// Denylist of logged-out tokens.
    pub revocations: Arc<dyn RevocationStore>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        users: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let codec = TokenCodec::new(config.jwt_secret.as_bytes());
        Self {
            config,
            codec,
            users,
            revocations,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `storefront_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    storefront_core::migrate::migrate(pool).await
}

/// Builds the Axum router with the auth routes and shared state.
pub fn router(state: AppState) -> Router {
    router_with(state, Router::new())
}

/// Builds the router with additional storefront routes mounted alongside auth.
///
/// Identity resolution wraps every route, including those in `storefront`,
/// which read the resolved user through the `Identity` extension.
pub fn router_with(state: AppState, storefront: Router<AppState>) -> Router {
    // Only for signed-out callers
    let anonymous = Router::new()
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_anonymous,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_PROFILE, get(auth::profile_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(anonymous)
        .merge(protected)
        .merge(storefront)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::resolve_identity,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
