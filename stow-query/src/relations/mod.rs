//! Eager loading of related entities.
//!
//! This module provides:
//! - `Navigation` / `NavigationPath` for declaring relations to load
//! - `IncludeResolver` for turning an unordered batch of paths into nested chains
//! - `LoadingPlan` and the `IncludeSink` trait for applying the result to a query
//!
//! ## Example
//!
//! ```rust,ignore
//! // Load each order's customer, and that customer's addresses
//! let order = repository
//!     .include(Navigation::<Order, Customer>::reference("customer"))
//!     .include(Navigation::<Customer, Address>::collection("addresses"))
//!     .get_first(|o: &Order| o.id == 7)
//!     .await?;
//! ```

mod navigation;
mod plan;
mod resolver;

pub use navigation::{Cardinality, Navigation, NavigationPath};
pub use plan::{IncludeSink, LoadInstruction, LoadingPlan, PlanNode};
pub use resolver::{IncludeResolver, resolve};
