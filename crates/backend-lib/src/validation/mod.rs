// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Form input validation.

use crate::auth::{validate_password_strength, PasswordRequirements};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$")
        .expect("email pattern compiles")
});

/// Possible validation errors. The display text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Please provide both email and password")]
    MissingCredentials,

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters long and contain at least one uppercase letter, one lowercase letter, one number, and one special character (@$!%*?&)")]
    WeakPassword(usize),

    #[error("New passwords do not match")]
    NewPasswordMismatch,

    #[error("New password must be at least {0} characters long and contain at least one uppercase letter, one lowercase letter, one number, and one special character")]
    WeakNewPassword(usize),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check an email address against the accepted format
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

/// Validate a login submission, returning the normalized email
pub fn validate_login(email: &str, password: &str) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_lowercase())
}

/// Validate a registration submission, returning the normalized email
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm_password: &str,
    requirements: &PasswordRequirements,
) -> ValidationResult<String> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if !validate_password_strength(password, requirements) {
        return Err(ValidationError::WeakPassword(requirements.min_length));
    }
    Ok(email.to_lowercase())
}

/// Validate the new password half of a password change
pub fn validate_new_password(
    new_password: &str,
    confirm_password: &str,
    requirements: &PasswordRequirements,
) -> ValidationResult<()> {
    if new_password != confirm_password {
        return Err(ValidationError::NewPasswordMismatch);
    }
    if !validate_password_strength(new_password, requirements) {
        return Err(ValidationError::WeakNewPassword(requirements.min_length));
    }
    Ok(())
}

/// Validate an email change, returning the normalized email
pub fn validate_email_change(email: &str) -> ValidationResult<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_lowercase())
}
