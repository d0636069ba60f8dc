//! SQLite backend errors.

use thiserror::Error;

/// Errors raised while opening or driving the SQLite connection.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Query construction or mapping error.
    #[error(transparent)]
    Core(#[from] rowgraph_core::Error),
}

/// Result type for SQLite backend operations.
pub type Result<T> = std::result::Result<T, SqliteError>;
