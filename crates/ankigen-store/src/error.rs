//! Error types for ankigen-store.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing a collection.
#[derive(Debug, Error)]
pub enum Error {
    /// The collection file could not be opened or locked.
    ///
    /// Fatal for the current call only; a later call may succeed once the
    /// competing writer releases the lock.
    #[error("collection unavailable: {0}")]
    StoreUnavailable(String),

    /// A deck name could not be used, even for auto-creation.
    #[error("invalid deck name: {0:?}")]
    InvalidDeck(String),

    /// A required card field was empty.
    #[error("card {0} is empty")]
    EmptyField(&'static str),

    /// The collection exists but does not have the expected layout.
    #[error("collection is corrupt: {0}")]
    Corrupt(String),

    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// JSON error in the collection's deck or note type tables.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::ReadOnly,
            ) => Error::StoreUnavailable(err.to_string()),
            _ => Error::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(matches!(Error::from(err), Error::StoreUnavailable(_)));
    }

    #[test]
    fn test_other_sqlite_errors_pass_through() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(Error::from(err), Error::Sqlite(_)));
    }
}
