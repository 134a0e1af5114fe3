//! Exit codes for questifyctl

use questify_common::StoreError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when a user, task or achievement does not exist
pub const EXIT_NOT_FOUND: i32 = 66;

/// Exit code when a unique name is already taken
pub const EXIT_CONFLICT: i32 = 67;

/// Exit code when the database is locked by another writer
pub const EXIT_BUSY: i32 = 75;

/// Map an error chain to an exit code
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|e| e.downcast_ref::<StoreError>()) {
        Some(StoreError::NotFound { .. }) => EXIT_NOT_FOUND,
        Some(StoreError::Conflict(_)) => EXIT_CONFLICT,
        Some(e) if e.is_retryable() => EXIT_BUSY,
        _ => EXIT_GENERAL_ERROR,
    }
}
