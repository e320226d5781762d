//! Counters and query history for the in-memory context.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use stow_query::{LoadInstruction, Tracking};

/// Context statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Reads executed.
    pub queries: u64,
    /// Changes staged.
    pub staged: u64,
    /// Successful `save_changes` calls that applied at least one change.
    pub flushes: u64,
    /// Rows affected by successful flushes.
    pub rows_affected: u64,
    /// Flushes that failed and left their changes staged.
    pub failed_flushes: u64,
    /// Changes dropped by `discard_changes`.
    pub discarded: u64,
}

/// Thread-safe context statistics.
#[derive(Debug, Default)]
pub(crate) struct AtomicMemoryStats {
    queries: AtomicU64,
    staged: AtomicU64,
    flushes: AtomicU64,
    rows_affected: AtomicU64,
    failed_flushes: AtomicU64,
    discarded: AtomicU64,
}

impl AtomicMemoryStats {
    #[inline]
    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_staged(&self, n: usize) {
        self.staged.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_flush(&self, rows: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.rows_affected.fetch_add(rows as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed_flush(&self) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_discard(&self, n: usize) {
        self.discarded.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Get a snapshot.
    pub(crate) fn snapshot(&self) -> MemoryStats {
        MemoryStats {
            queries: self.queries.load(Ordering::Relaxed),
            staged: self.staged.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Kind of read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// `fetch_first`
    First,
    /// `fetch_all`
    All,
    /// `fetch_any`
    Any,
}

impl fmt::Display for ReadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// A read the context executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedQuery {
    /// Entity name of the queried type.
    pub entity: &'static str,
    /// Which read was made.
    pub kind: ReadKind,
    /// Tracking mode of the query.
    pub tracking: Tracking,
    /// Load instructions attached to the query, in application order.
    pub includes: Vec<LoadInstruction>,
}

impl ExecutedQuery {
    /// Relation names of the attached loads, in application order.
    pub fn relations(&self) -> Vec<&str> {
        self.includes.iter().map(|i| i.path().relation()).collect()
    }
}

impl fmt::Display for ExecutedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.entity)?;
        for include in &self.includes {
            write!(f, ".{}", include)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = AtomicMemoryStats::default();
        stats.record_query();
        stats.record_staged(3);
        stats.record_flush(3);
        stats.record_discard(1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.queries, 1);
        assert_eq!(snapshot.staged, 3);
        assert_eq!(snapshot.flushes, 1);
        assert_eq!(snapshot.rows_affected, 3);
        assert_eq!(snapshot.failed_flushes, 0);
        assert_eq!(snapshot.discarded, 1);
    }

    #[test]
    fn test_read_kind_display() {
        assert_eq!(ReadKind::First.to_string(), "first");
        assert_eq!(ReadKind::Any.to_string(), "any");
    }
}
