//! Error types for the report store and session service.

use urban_core::UrbanError;
use uuid::Uuid;

/// Errors from the SQLite-backed stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("report not found: {0}")]
    ReportNotFound(Uuid),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for UrbanError {
    fn from(err: StoreError) -> Self {
        UrbanError::Storage(err.to_string())
    }
}
