//! Input checks for registration and login.

use super::AuthError;
use super::password::MIN_PASSWORD_LENGTH;

/// Longest email accepted (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Lowercase and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic syntactic email check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Validate registration input, returning the normalized email.
pub fn validate_registration(email: &str, password: &str) -> Result<String, AuthError> {
    require_both(email, password)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AuthError::ValidationError("Email address is invalid".into()));
    }
    Ok(email)
}

/// Validate login input, returning the normalized email.
pub fn validate_login(email: &str, password: &str) -> Result<String, AuthError> {
    require_both(email, password)?;
    Ok(normalize_email(email))
}

fn require_both(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::ValidationError(
            "Email and password are required".into(),
        ));
    }
    Ok(())
}
