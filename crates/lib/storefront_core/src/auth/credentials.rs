//! Credential store: persisted user records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::{User, UserWithPassword};

/// Access to user records.
///
/// Emails are expected already normalized; uniqueness is enforced by the store
/// and reported as [`AuthError::DuplicateEmail`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a user and their password hash by email.
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, AuthError>;

    /// Fetch a user by ID. Unknown or malformed IDs yield `None`.
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError>;

    /// Create a new user with a store-generated ID.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AuthError>;

    /// Create a user with a caller-chosen ID (fixture seeding).
    async fn create_user_with_id(
        &self,
        user_id: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError>;
}

/// PostgreSQL-backed credential store.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type UserRow = (String, String, String, DateTime<Utc>, DateTime<Utc>);

fn user_from_row((id, email, password_hash, created_at, updated_at): UserRow) -> UserWithPassword {
    UserWithPassword {
        user: User {
            id,
            email,
            created_at,
            updated_at,
        },
        password_hash,
    }
}

/// Unique violations on insert mean the email (or fixture ID) is taken.
fn map_insert_error(e: sqlx::Error) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateEmail,
        _ => AuthError::DbError(e),
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id::text, email, password_hash, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        let Ok(id) = ::uuid::Uuid::parse_str(user_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id::text, email, password_hash, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| user_from_row(r).user))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
             RETURNING id::text, email, password_hash, created_at, updated_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(user_from_row(row).user)
    }

    async fn create_user_with_id(
        &self,
        user_id: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let id = ::uuid::Uuid::parse_str(user_id)
            .map_err(|e| AuthError::ValidationError(format!("invalid user id: {e}")))?;
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id::text, email, password_hash, created_at, updated_at",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(user_from_row(row).user)
    }
}
