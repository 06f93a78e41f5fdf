//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `{sub, email, iat, exp}`. Verification never
//! errors: anything malformed, badly signed, or expired is simply `None`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::AuthError;
use crate::models::auth::{IssuedToken, TokenClaims};

/// Session token lifetime: 7 days.
pub const TOKEN_VALIDITY_SECS: i64 = 7 * 24 * 60 * 60;

/// Signs and verifies session tokens with a process-wide secret.
///
/// Holds no mutable state; clone freely and share across requests.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl TokenCodec {
    /// Build a codec for the given signing secret with the standard 7 day window.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validity: Duration::seconds(TOKEN_VALIDITY_SECS),
        }
    }

    /// Length of the validity window.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a token for `user_id`, valid from now for the full window.
    pub fn issue(&self, user_id: &str, email: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let iat = now.timestamp();
        let exp = iat + self.validity.num_seconds();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp,
            iat,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::TokenError("expiry out of range".into()))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and expiry against the current time.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, then require `now < exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below without leeway.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .ok()?
            .claims;
        (now.timestamp() < claims.exp).then_some(claims)
    }

    /// Read the expiry claim without checking the signature or expiry.
    ///
    /// Only for tokens that already passed [`TokenCodec::verify`] upstream.
    pub fn decode_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .ok()?
            .claims
            .expires_at()
    }
}

/// Env vars consulted for the signing secret, in order.
const SECRET_ENV_VARS: [&str; 2] = ["JWT_SECRET", "AUTH_SECRET"];

/// Resolve the signing secret once at startup.
///
/// The first non-empty env var in `SECRET_ENV_VARS` wins. Otherwise the secret
/// persisted under the data dir is reused, or a fresh one is generated and saved.
pub fn resolve_jwt_secret() -> String {
    SECRET_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|secret| !secret.is_empty())
        .unwrap_or_else(|| load_or_create_secret(&jwt_secret_path()))
}

fn load_or_create_secret(path: &Path) -> String {
    if let Some(existing) = std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return existing;
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    match persist_secret(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        // Sessions will not survive a restart.
        Err(e) => warn!(path = %path.display(), error = %e, "could not persist JWT secret"),
    }
    secret
}

fn persist_secret(path: &Path, secret: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, secret)
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront")
        .join("jwt-secret")
}
