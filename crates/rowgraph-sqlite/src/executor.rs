//! SQLite connection wrapper implementing [`Executor`].

use rusqlite::{Connection, Params};
use rowgraph_core::{Cursor, CursorError, Entity, Executor, Query};
use tracing::{debug, info};

use crate::config::SqliteConfig;
use crate::cursor::SqliteCursor;
use crate::error::Result;

/// Runs rowgraph statements on one SQLite connection.
pub struct SqliteExecutor {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteExecutor {
    /// Open the database described by `config`.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout)?;
        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        info!(path = ?config.path, "Opened SQLite database");
        Ok(Self { conn, config })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open(SqliteConfig::in_memory())
    }

    /// Run one or more semicolon-separated statements.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run one statement with parameters, returning the changed row count.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Start a query for `E` using this executor's query configuration.
    pub fn select<E: Entity>(&self) -> Query<'static, E> {
        Query::new().with_config(self.config.query.clone())
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Configuration the executor was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl Executor for SqliteExecutor {
    fn query<R, F>(&self, sql: &str, f: F) -> rowgraph_core::Result<R>
    where
        F: FnOnce(&mut dyn Cursor) -> rowgraph_core::Result<R>,
    {
        let mut stmt = self.conn.prepare(sql).map_err(CursorError::backend)?;
        let labels: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        debug!(columns = labels.len(), "Prepared statement");

        let rows = stmt.query([]).map_err(CursorError::backend)?;
        let mut cursor = SqliteCursor::new(rows, labels);
        let result = f(&mut cursor);
        drop(cursor);
        result
    }
}
