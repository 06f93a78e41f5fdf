//! Revocation store: denylist of logged-out session tokens.
//!
//! Tokens are stored as SHA-256 fingerprints together with their own expiry.
//! Records never change after insert, so purging by `expires_at < now` can run
//! alongside `revoke`/`is_revoked` without extra locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use super::AuthError;
use crate::uuid::time_ordered_id;

/// SHA-256 hex fingerprint of a token, used as the denylist key.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage for revoked-but-not-yet-expired tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token` as revoked until `expires_at`. Revoking twice is not an error.
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Whether `token` has a revocation record.
    async fn is_revoked(&self, token: &str) -> Result<bool, AuthError>;

    /// Delete every record with `expires_at < now`, returning how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// PostgreSQL-backed revocation store (`revoked_tokens` table).
#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO revoked_tokens (id, token_hash, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (token_hash) DO NOTHING",
        )
        .bind(time_ordered_id())
        .bind(token_fingerprint(token))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token_hash = $1)",
        )
        .bind(token_fingerprint(token))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
