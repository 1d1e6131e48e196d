use thiserror::Error;

use crate::models::JobStatus;

/// Errors produced by the store layer. From the client's point of view every
/// variant is a transport failure: the call did not take effect.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Results column held malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The filter does not apply to the table.
    #[error("Invalid scope '{scope}': {reason}")]
    InvalidScope { scope: String, reason: &'static str },

    /// The change feed transport is not connected.
    #[error("Change feed unavailable")]
    FeedUnavailable,

    /// The processing service attempted an illegal status change.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// The call requires a signed-in identity.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The signed-in identity does not own the row.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An object already exists at the requested path.
    #[error("Object already exists: {0}")]
    ObjectExists(String),

    /// Blob storage failure.
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Public URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A guarded section panicked while holding the lock.
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
