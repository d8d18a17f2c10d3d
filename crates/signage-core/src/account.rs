//! Rules for the admin account's credentials.
//!
//! Hashing and verification live in the web crate; these checks only decide
//! whether a requested change is acceptable.

use crate::error::{CoreError, CoreResult};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;

/// Stored admin account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// Checks the strength rules for a new password.
pub fn validate_new_password(new_password: &str) -> CoreResult<()> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "new password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Checks a requested username and returns it trimmed.
pub fn validate_new_username(current: &str, requested: &str) -> CoreResult<String> {
    let requested = requested.trim();

    if requested.len() < MIN_USERNAME_LEN || requested.len() > MAX_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');
    if !requested.chars().all(allowed) {
        return Err(CoreError::Validation(
            "username may only contain letters, digits, dots, dashes and underscores".to_string(),
        ));
    }

    if requested == current {
        return Err(CoreError::Validation(
            "new username is the same as the current one".to_string(),
        ));
    }

    Ok(requested.to_string())
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
