//! Storefront auth API server binary.
//!
//! Composition root: parses configuration, connects the stores, owns the
//! revocation reaper, and serves the router until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use storefront_api::AppState;
use storefront_api::config::{ApiConfig, secure_cookies_default};
use storefront_core::auth::AuthMode;
use storefront_core::auth::credentials::{CredentialStore, PgCredentialStore};
use storefront_core::auth::jwt::resolve_jwt_secret;
use storefront_core::auth::memory::{MemoryCredentialStore, MemoryRevocationStore};
use storefront_core::auth::reaper::Reaper;
use storefront_core::auth::revocation::{PgRevocationStore, RevocationStore};
use storefront_core::fixtures::seed_default_user;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "storefront_api_server", about = "Storefront auth API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/storefront"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Require real accounts. Only the exact value `true` enables authentication.
    #[arg(
        long,
        env = "AUTH_ENABLED",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = parse_auth_enabled
    )]
    auth_enabled: bool,

    /// Mark the session cookie `Secure`. Defaults to on when `APP_ENV=production`.
    #[arg(long, env = "COOKIE_SECURE")]
    cookie_secure: Option<bool>,

    /// Seconds between revocation purges.
    #[arg(
        long,
        env = "REAPER_INTERVAL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    reaper_interval_secs: u64,

    /// Create the well-known default user if it does not exist.
    #[arg(long, env = "SEED_DEFAULT_USER", default_value_t = false)]
    seed_default_user: bool,

    /// Keep users and revocations in memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

fn parse_auth_enabled(value: &str) -> Result<bool, String> {
    Ok(value == "true")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,storefront_api=debug,storefront_core=debug")
        }))
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr.clone(),
        auth_mode: AuthMode::from_flag(args.auth_enabled),
        jwt_secret: resolve_jwt_secret(),
        secure_cookies: args.cookie_secure.unwrap_or_else(secure_cookies_default),
        reaper_interval: Duration::from_secs(args.reaper_interval_secs),
    };

    info!(
        auth_mode = ?config.auth_mode,
        secure_cookies = config.secure_cookies,
        in_memory = args.in_memory,
        "starting storefront_api_server"
    );

    let (users, revocations): (Arc<dyn CredentialStore>, Arc<dyn RevocationStore>) =
        if args.in_memory {
            warn!("using in-memory stores, all data is lost on exit");
            (
                Arc::new(MemoryCredentialStore::new()),
                Arc::new(MemoryRevocationStore::new()),
            )
        } else {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&args.database_url)
                .await?;

            info!("running database migrations");
            storefront_api::migrate(&pool).await?;

            (
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgRevocationStore::new(pool)),
            )
        };

    if args.seed_default_user {
        seed_default_user(users.as_ref()).await?;
    }

    let reaper_ct = CancellationToken::new();
    let reaper = Reaper::new(revocations.clone(), config.reaper_interval).spawn(reaper_ct.clone());

    let state = AppState::new(config.clone(), users, revocations);
    let app = storefront_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let api_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the reaper once the server has drained.
    reaper_ct.cancel();
    let _ = reaper.await;

    api_result?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
