//! In-memory credential and revocation stores.
//!
//! Same contract as the PostgreSQL stores; used by tests and by the server's
//! `--in-memory` mode. Every operation is a single `DashMap` call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::AuthError;
use super::credentials::CredentialStore;
use super::revocation::{RevocationStore, token_fingerprint};
use crate::models::auth::{RevocationRecord, User, UserWithPassword};
use crate::uuid::time_ordered_id;

/// Users keyed by ID, with an email → ID index that enforces uniqueness.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, UserWithPassword>,
    emails: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user out of band (no subsystem operation deletes users).
    pub fn remove_user(&self, user_id: &str) {
        if let Some((_, record)) = self.users.remove(user_id) {
            self.emails.remove(&record.user.email);
        }
    }

    fn insert(&self, id: String, email: &str, password_hash: &str) -> Result<User, AuthError> {
        if self.users.contains_key(&id) {
            return Err(AuthError::DuplicateEmail);
        }
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: id.clone(),
                    email: email.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(
                    id.clone(),
                    UserWithPassword {
                        user: user.clone(),
                        password_hash: password_hash.to_string(),
                    },
                );
                slot.insert(id);
                Ok(user)
            }
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let Some(id) = self.emails.get(email).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(user_id).map(|r| r.value().user.clone()))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AuthError> {
        self.insert(Uuid::new_v4().to_string(), email, password_hash)
    }

    async fn create_user_with_id(
        &self,
        user_id: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AuthError> {
        let id = Uuid::parse_str(user_id)
            .map_err(|e| AuthError::ValidationError(format!("invalid user id: {e}")))?;
        self.insert(id.to_string(), email, password_hash)
    }
}

/// Revocation records keyed by token fingerprint.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    records: DashMap<String, RevocationRecord>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        let token_hash = token_fingerprint(token);
        self.records
            .entry(token_hash.clone())
            .or_insert_with(|| RevocationRecord {
                id: time_ordered_id().to_string(),
                token_hash,
                expires_at,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.records.contains_key(&token_fingerprint(token)))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut deleted = 0u64;
        self.records.retain(|_, record| {
            let keep = record.expires_at >= now;
            if !keep {
                deleted += 1;
            }
            keep
        });
        Ok(deleted)
    }
}
