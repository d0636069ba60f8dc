//! rowgraph SQLite backend.
//!
//! [`SqliteExecutor`] runs the statements built by `rowgraph-core` on a
//! `rusqlite` connection and hands the mapper a [`SqliteCursor`] addressed by
//! projection label.

pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod repository;

pub use config::SqliteConfig;
pub use cursor::SqliteCursor;
pub use error::{Result, SqliteError};
pub use executor::SqliteExecutor;
pub use repository::Repository;
