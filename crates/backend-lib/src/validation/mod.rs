// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Login form validation.

use jokes_common::{FieldErrors, LoginForm};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// Common validation constants
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 6;
// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern compiles"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    let length = username.chars().count();
    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Usernames must be at least {MIN_USERNAME_LENGTH} characters long"
        )));
    }

    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Usernames cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Usernames may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }

    Ok(username)
}

/// Validate a password
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Passwords must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::InvalidPassword(format!(
            "Passwords cannot exceed {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    Ok(password)
}

/// Validate every field of the login form, collecting one message per field
pub fn validate_login_form(form: &LoginForm) -> FieldErrors {
    FieldErrors {
        username: validate_username(&form.username)
            .err()
            .map(message),
        password: validate_password(&form.password)
            .err()
            .map(message),
    }
}

fn message(err: ValidationError) -> String {
    match err {
        ValidationError::InvalidUsername(msg) | ValidationError::InvalidPassword(msg) => msg,
    }
}
