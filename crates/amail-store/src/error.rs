use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors produced by the store layer.
///
/// A lookup that matches nothing is not an error; those return `Ok(None)`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error not covered by a more specific variant.
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// Another process held the write lock for the whole busy timeout.
    #[error("Database is busy (lock not acquired within the busy timeout): {0}")]
    Busy(rusqlite::Error),

    /// Duplicate id or dangling foreign key.
    #[error("Constraint violation: {0}")]
    Constraint(rusqlite::Error),

    /// A short id matched more than one message in the searched scope.
    #[error("ambiguous ID prefix: {prefix} matches {matches} messages")]
    AmbiguousPrefix { prefix: String, matches: usize },

    /// Sending failed; nothing was written.
    #[error("failed to send message {id}: {source}")]
    Send {
        id: String,
        #[source]
        source: Box<StoreError>,
    },

    /// No `.amail` directory in the start directory or any ancestor.
    #[error("not in an amail project (no .amail directory found above {})", start.display())]
    NotInProject { start: PathBuf },

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether the failure was lock contention rather than a real fault.
    pub fn is_busy(&self) -> bool {
        match self {
            StoreError::Busy(_) => true,
            StoreError::Send { source, .. } => source.is_busy(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Busy(err),
            Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(err),
            _ => StoreError::Sqlite(err),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
