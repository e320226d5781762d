//! Query values handed to a data context.
//!
//! A read is described by two things:
//! - [`QueryOptions`]: what the caller asked for on top of the predicate
//!   (navigation paths to eager-load, change tracking);
//! - [`Query`]: the executable form, with the resolved load instructions
//!   already attached.
//!
//! ```rust
//! use stow_query::{Entity, Navigation, QueryOptions, Tracking};
//!
//! #[derive(Clone)]
//! struct Order;
//! #[derive(Clone)]
//! struct Customer;
//!
//! impl Entity for Order {
//!     const ENTITY_NAME: &'static str = "Order";
//! }
//! impl Entity for Customer {
//!     const ENTITY_NAME: &'static str = "Customer";
//! }
//!
//! let options = QueryOptions::new()
//!     .include(Navigation::<Order, Customer>::reference("customer"))
//!     .tracking(Tracking::NoTracking);
//!
//! assert_eq!(options.len(), 1);
//! assert_eq!(options.resolve().unwrap().len(), 1);
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::QueryResult;
use crate::predicate::Predicate;
use crate::relations::{IncludeResolver, IncludeSink, LoadInstruction, LoadingPlan, Navigation, NavigationPath};
use crate::traits::Entity;

/// Whether the data context tracks entities returned by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracking {
    /// Returned entities are tracked for changes.
    Tracking,
    /// Returned entities are detached snapshots.
    #[default]
    NoTracking,
}

impl Tracking {
    /// Check if change tracking is enabled.
    pub fn is_tracking(&self) -> bool {
        matches!(self, Self::Tracking)
    }
}

/// Options for one read: the include batch and the tracking mode.
///
/// Options are built by value and consumed by the read that uses them, so
/// nothing carries over into the next query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    includes: IndexSet<NavigationPath>,
    tracking: Option<Tracking>,
}

impl QueryOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a navigation path to eager-load.
    pub fn include<S: Entity, T: Entity>(self, navigation: Navigation<S, T>) -> Self {
        self.include_path(navigation.into_path())
    }

    /// Add an erased navigation path to eager-load.
    pub fn include_path(mut self, path: NavigationPath) -> Self {
        self.includes.insert(path);
        self
    }

    /// Set the tracking mode for this read.
    pub fn tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = Some(tracking);
        self
    }

    /// The tracking mode requested, if any.
    pub fn tracking_mode(&self) -> Option<Tracking> {
        self.tracking
    }

    /// The declared paths, in declaration order.
    pub fn includes(&self) -> impl Iterator<Item = &NavigationPath> {
        self.includes.iter()
    }

    /// Number of declared paths.
    pub fn len(&self) -> usize {
        self.includes.len()
    }

    /// Check if no paths are declared.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Resolve the declared paths into a loading plan.
    pub fn resolve(&self) -> QueryResult<LoadingPlan> {
        IncludeResolver::new(self.includes.iter().cloned()).resolve()
    }
}

/// An executable read over `T`.
pub struct Query<T> {
    predicate: Predicate<T>,
    tracking: Tracking,
    includes: Vec<LoadInstruction>,
}

impl<T> Query<T> {
    /// Create a no-tracking query with no loads attached.
    pub fn new(predicate: Predicate<T>) -> Self {
        Self {
            predicate,
            tracking: Tracking::NoTracking,
            includes: Vec::new(),
        }
    }

    /// Set the tracking mode.
    pub fn with_tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Attach every instruction of a loading plan.
    pub fn with_plan(mut self, plan: &LoadingPlan) -> Self {
        plan.apply(&mut self);
        self
    }

    /// The filter predicate.
    pub fn predicate(&self) -> &Predicate<T> {
        &self.predicate
    }

    /// Evaluate the predicate against an entity.
    pub fn matches(&self, item: &T) -> bool {
        self.predicate.matches(item)
    }

    /// The tracking mode.
    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Attached load instructions, in application order.
    pub fn includes(&self) -> &[LoadInstruction] {
        &self.includes
    }

    /// Top-level loads only.
    pub fn base_includes(&self) -> impl Iterator<Item = &LoadInstruction> {
        self.includes.iter().filter(|i| i.is_base())
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            tracking: self.tracking,
            includes: self.includes.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("tracking", &self.tracking)
            .field("includes", &self.includes)
            .finish_non_exhaustive()
    }
}

impl<T> IncludeSink for Query<T> {
    fn include(&mut self, path: &NavigationPath) {
        self.includes.include(path);
    }

    fn then_include(&mut self, ancestry: &[NavigationPath], path: &NavigationPath) {
        self.includes.then_include(ancestry, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Clone, Debug, PartialEq)]
    struct Order {
        total: u32,
    }
    #[derive(Clone)]
    struct Customer;
    #[derive(Clone)]
    struct Address;

    impl Entity for Order {
        const ENTITY_NAME: &'static str = "Order";
    }
    impl Entity for Customer {
        const ENTITY_NAME: &'static str = "Customer";
    }
    impl Entity for Address {
        const ENTITY_NAME: &'static str = "Address";
    }

    #[test]
    fn test_tracking_default() {
        assert_eq!(Tracking::default(), Tracking::NoTracking);
        assert!(QueryOptions::new().tracking_mode().is_none());
        assert!(Tracking::Tracking.is_tracking());
    }

    #[test]
    fn test_options_dedup_includes() {
        let options = QueryOptions::new()
            .include(Navigation::<Order, Customer>::reference("customer"))
            .include(Navigation::<Order, Customer>::reference("customer"));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_query_with_plan() {
        let plan = QueryOptions::new()
            .include(Navigation::<Customer, Address>::reference("address"))
            .include(Navigation::<Order, Customer>::reference("customer"))
            .resolve()
            .unwrap();

        let query = Query::new(Predicate::new(|o: &Order| o.total > 10)).with_plan(&plan);

        assert_eq!(query.includes().len(), 2);
        assert_eq!(query.base_includes().count(), 1);
        assert_eq!(query.includes()[1].ancestry()[0].relation(), "customer");
        assert!(query.matches(&Order { total: 11 }));
        assert!(!query.matches(&Order { total: 3 }));
    }

    #[test]
    fn test_query_defaults_to_no_tracking() {
        let query = Query::new(Predicate::<Order>::always());
        assert_eq!(query.tracking(), Tracking::NoTracking);
        assert!(query.includes().is_empty());
    }
}
