//! Boolean predicates over entities.

use std::fmt;
use std::sync::Arc;

/// A shareable boolean predicate over `T`.
///
/// The repository treats predicates as opaque and hands them to the data
/// context, which decides how to evaluate them.
pub struct Predicate<T> {
    check: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Predicate<T> {
    /// Create a predicate from a closure.
    pub fn new(check: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            check: Arc::new(check),
        }
    }

    /// A predicate that matches every entity.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Evaluate the predicate.
    pub fn matches(&self, item: &T) -> bool {
        (self.check)(item)
    }

    /// Combine with another predicate; both must match.
    pub fn and(self, other: Predicate<T>) -> Self
    where
        T: 'static,
    {
        Self::new(move |item| self.matches(item) && other.matches(item))
    }

    /// Combine with another predicate; either may match.
    pub fn or(self, other: Predicate<T>) -> Self
    where
        T: 'static,
    {
        Self::new(move |item| self.matches(item) || other.matches(item))
    }

    /// Negate the predicate.
    pub fn not(self) -> Self
    where
        T: 'static,
    {
        Self::new(move |item| !self.matches(item))
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}
