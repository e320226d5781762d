//! Unit-of-work scopes and flush policy.
//!
//! Outside a unit of work every repository write is followed by a flush.
//! Inside one, flushes are deferred and performed once when the outermost
//! scope completes successfully.
//!
//! ```rust
//! use stow_query::FlushPolicy;
//!
//! let policy = FlushPolicy::new();
//! assert!(policy.is_enabled());
//!
//! {
//!     let outer = policy.suspend();
//!     assert!(outer.is_outermost());
//!
//!     let inner = policy.suspend();
//!     assert!(!inner.is_outermost());
//!     drop(inner);
//!
//!     // Still inside the outer scope
//!     assert!(!policy.is_enabled());
//! }
//!
//! // Scopes release on drop, whatever path left them
//! assert!(policy.is_enabled());
//! ```
//!
//! # Unit of work usage (requires async runtime)
//!
//! ```rust,ignore
//! // Both inserts are flushed together once the closure returns Ok
//! let order = repository
//!     .transaction(|repo| async move {
//!         let customer = repo.add(customer).await?;
//!         repo.add(Order::for_customer(&customer)).await
//!     })
//!     .await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

/// Tracks how many unit-of-work scopes are open.
#[derive(Debug, Default)]
pub struct FlushPolicy {
    depth: AtomicUsize,
}

impl FlushPolicy {
    /// Create a policy with no open scopes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if writes should flush immediately.
    pub fn is_enabled(&self) -> bool {
        self.depth() == 0
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Open a scope. Flushing stays suspended until every scope is dropped.
    pub fn suspend(&self) -> FlushScope<'_> {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(depth, "Flush suspended");
        FlushScope {
            policy: self,
            depth,
        }
    }
}

/// An open unit-of-work scope; releases itself on drop.
#[derive(Debug)]
#[must_use = "flushing resumes as soon as the scope is dropped"]
pub struct FlushScope<'a> {
    policy: &'a FlushPolicy,
    depth: usize,
}

impl FlushScope<'_> {
    /// Nesting depth of this scope, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check if this is the outermost scope.
    pub fn is_outermost(&self) -> bool {
        self.depth == 1
    }
}

impl Drop for FlushScope<'_> {
    fn drop(&mut self) {
        let remaining = self.policy.depth.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!(depth = remaining, "Flush scope released");
    }
}
