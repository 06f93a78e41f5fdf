//! Well-known fixture user for reproducible test data.
//!
//! The same ID doubles as the identity every request gets while
//! authentication is disabled, so data seeded for it stays visible in both modes.

use tracing::{info, warn};

use crate::auth::credentials::CredentialStore;
use crate::auth::password::hash_password;
use crate::auth::{AuthError, DEFAULT_USER_ID};

/// Email of the fixture user.
pub const DEFAULT_USER_EMAIL: &str = "default@example.com";

/// Password of the fixture user.
pub const DEFAULT_USER_PASSWORD: &str = "password123";

/// Create the fixture user if it does not exist yet.
///
/// Returns `true` when a user was created.
pub async fn seed_default_user(store: &dyn CredentialStore) -> Result<bool, AuthError> {
    if store.find_user_by_id(DEFAULT_USER_ID).await?.is_some() {
        return Ok(false);
    }
    let password_hash = hash_password(DEFAULT_USER_PASSWORD)?;
    match store
        .create_user_with_id(DEFAULT_USER_ID, DEFAULT_USER_EMAIL, &password_hash)
        .await
    {
        Ok(_) => {
            info!(email = DEFAULT_USER_EMAIL, "seeded default user");
            Ok(true)
        }
        Err(AuthError::DuplicateEmail) => {
            warn!(email = DEFAULT_USER_EMAIL, "default user email already taken");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
