//! Error types for the Questify progress store.
//!
//! The award engine itself is total and never fails; everything here
//! originates at the storage boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }

    /// Stable numeric code, so callers can map errors onto their own transport.
    pub fn code(&self) -> i32 {
        match self {
            StoreError::NotFound { .. } => -32004,
            StoreError::Conflict(_) => -32009,
            StoreError::Database(_) => -32010,
            StoreError::Poisoned(_) => -32011,
            StoreError::Io(_) => -32006,
            StoreError::Json(_) => -32700,
        }
    }

    /// Errors where retrying the whole unit can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
