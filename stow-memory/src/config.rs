//! In-memory context configuration.

/// Configuration for a [`MemoryContext`](crate::MemoryContext).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Reject top-level loads that do not start from the queried entity.
    pub strict_includes: bool,
    /// Keep a history of executed queries.
    pub record_queries: bool,
    /// Maximum number of queries kept in the history (oldest dropped first).
    pub history_limit: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            strict_includes: true,
            record_queries: true,
            history_limit: Some(1024),
        }
    }
}

impl MemoryConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict include checking.
    pub fn strict_includes(mut self, strict: bool) -> Self {
        self.strict_includes = strict;
        self
    }

    /// Enable or disable the query history.
    pub fn record_queries(mut self, record: bool) -> Self {
        self.record_queries = record;
        self
    }

    /// Bound the query history. `None` keeps everything.
    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }
}
