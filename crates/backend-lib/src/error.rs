// crates/backend-lib/src/error.rs

//! Central error type for the authentication core.
use crate::validation::ValidationError;
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or policy-violating input; the message is user-correctable.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authentication failure. Deliberately says nothing about which part failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VAL_001",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Transient(_) => "TRANSIENT_001",
            AppError::Internal(_) => "INT_001",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Whether this error comes from infrastructure rather than the caller's input
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Transient(_) | AppError::Internal(_) | AppError::Io(_) | AppError::Json(_)
        )
    }

    /// Message suitable for a notice. Infrastructure failures collapse to
    /// `fallback` so internal detail never reaches the client.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::InvalidCredentials => self.to_string(),
            AppError::Conflict(msg) | AppError::NotFound(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
