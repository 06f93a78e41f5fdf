//! API server configuration.

use std::fmt;
use std::time::Duration;

use storefront_core::auth::AuthMode;
use storefront_core::auth::reaper::DEFAULT_REAPER_INTERVAL;

/// Configuration for the API server. Built once at startup, read-only after.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// Real accounts or the fixed default identity.
    pub auth_mode: AuthMode,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Mark the session cookie `Secure` (HTTPS only).
    pub secure_cookies: bool,
    /// How often the reaper purges expired revocation records.
    pub reaper_interval: Duration,
}

impl ApiConfig {
    /// Config with defaults for everything but mode and secret.
    pub fn new(auth_mode: AuthMode, jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            auth_mode,
            jwt_secret: jwt_secret.into(),
            secure_cookies: secure_cookies_default(),
            reaper_interval: DEFAULT_REAPER_INTERVAL,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("auth_mode", &self.auth_mode)
            .field("jwt_secret", &"<redacted>")
            .field("secure_cookies", &self.secure_cookies)
            .field("reaper_interval", &self.reaper_interval)
            .finish()
    }
}

/// Secure cookies are on by default only when `APP_ENV=production`.
pub fn secure_cookies_default() -> bool {
    std::env::var("APP_ENV").is_ok_and(|v| v == "production")
}
