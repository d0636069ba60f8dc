//! SQLite backend configuration.

use std::path::PathBuf;
use std::time::Duration;

use rowgraph_core::QueryConfig;

/// Default time to wait on a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite backend configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file, `None` for an in-memory database.
    pub path: Option<PathBuf>,

    /// Time to wait on a locked database.
    pub busy_timeout: Duration,

    /// Enforce foreign key constraints.
    pub foreign_keys: bool,

    /// Query construction settings.
    pub query: QueryConfig,
}

impl SqliteConfig {
    /// Configuration for a database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::in_memory()
        }
    }

    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
            query: QueryConfig::default(),
        }
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable foreign key enforcement.
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the query configuration.
    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}
