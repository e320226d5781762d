//! # stow-query
//!
//! Repository facade and include-chain resolution for Stow.
//!
//! This crate provides:
//! - A generic [`Repository`] over any [`DataContext`] (`add`, `get_first`, `get_where`,
//!   `is_any`, `delete`, `transaction`)
//! - Typed navigation paths and the resolver that nests them into loading plans
//! - Unit-of-work scopes that batch writes into one flush
//! - Configuration (`stow.toml`) and logging setup
//!
//! ## Navigation Paths
//!
//! Declare the relations to eager-load. The resolver works out the nesting:
//!
//! ```rust
//! use stow_query::{Entity, Navigation, QueryOptions};
//!
//! #[derive(Clone)]
//! struct Order;
//! #[derive(Clone)]
//! struct Customer;
//! #[derive(Clone)]
//! struct Address;
//!
//! impl Entity for Order {
//!     const ENTITY_NAME: &'static str = "Order";
//! }
//! impl Entity for Customer {
//!     const ENTITY_NAME: &'static str = "Customer";
//! }
//! impl Entity for Address {
//!     const ENTITY_NAME: &'static str = "Address";
//! }
//!
//! let plan = QueryOptions::new()
//!     .include(Navigation::<Customer, Address>::collection("addresses"))
//!     .include(Navigation::<Order, Customer>::reference("customer"))
//!     .resolve()
//!     .unwrap();
//!
//! assert_eq!(plan.to_string(), "Order.customer -> Customer.addresses[]");
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use stow_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::cyclic_include(&["A.b", "B.a", "A.b"]);
//! assert_eq!(err.code, ErrorCode::CyclicInclude);
//! assert!(err.is_include_error());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod predicate;
pub mod query;
pub mod relations;
pub mod repository;
pub mod traits;
pub mod transaction;

pub use config::RepositoryConfig;
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use predicate::Predicate;
pub use query::{Query, QueryOptions, Tracking};
pub use relations::{
    Cardinality, IncludeResolver, IncludeSink, LoadInstruction, LoadingPlan, Navigation,
    NavigationPath, PlanNode,
};
pub use repository::{Includes, ReadRepository, Repository};
pub use traits::{BoxFuture, DataContext, Entity, EntityKey, EntityKind};
pub use transaction::{FlushPolicy, FlushScope};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::RepositoryConfig;
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::query::{QueryOptions, Tracking};
    pub use crate::relations::Navigation;
    pub use crate::repository::{ReadRepository, Repository};
    pub use crate::traits::{DataContext, Entity, EntityKey};
}
