//! Query construction configuration.

use serde::{Deserialize, Serialize};

/// Default maximum number of joins on one path from the root entity.
pub const DEFAULT_MAX_JOIN_DEPTH: usize = 8;

/// Whether generated SQL is logged by default.
pub const DEFAULT_LOG_STATEMENTS: bool = true;

/// What to do when a foreign-key chain revisits a field already on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Fail with a reference cycle error.
    #[default]
    Reject,
    /// Stop descending; the repeated field is left unset when mapping.
    Truncate,
}

/// Configuration for building and running queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum join depth below the root entity.
    pub max_join_depth: usize,

    /// Handling of self- and mutually-referential foreign keys.
    pub cycle_policy: CyclePolicy,

    /// Log every generated statement at debug level.
    pub log_statements: bool,
}

impl QueryConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_join_depth: DEFAULT_MAX_JOIN_DEPTH,
            cycle_policy: CyclePolicy::default(),
            log_statements: DEFAULT_LOG_STATEMENTS,
        }
    }

    /// Set the maximum join depth.
    pub fn with_max_join_depth(mut self, depth: usize) -> Self {
        self.max_join_depth = depth;
        self
    }

    /// Set the cycle policy.
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Enable or disable statement logging.
    pub fn with_log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Load a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self::new()
    }
}
