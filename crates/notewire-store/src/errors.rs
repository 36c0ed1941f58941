//! Storage error types.

use thiserror::Error;

/// Convenience alias for storage results.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by [`crate::store::NoteStore`].
///
/// `DuplicateEmail` keeps the user-facing wording because the dispatcher
/// forwards it verbatim in the register error response.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique email index rejected a second registration.
    #[error("Email already registered")]
    DuplicateEmail,

    /// Any other SQLite failure.
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection pool is exhausted or broken.
    #[error("storage pool error: {0}")]
    Pool(#[from] r2d2::Error),
}
