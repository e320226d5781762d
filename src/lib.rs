//! # Stow
//!
//! A generic repository facade with typed include-chain resolution.
//!
//! Stow provides:
//! - One repository surface (`add`, `get_first`, `get_where`, `is_any`, `delete`)
//!   for every entity type over any data context
//! - Eager loading declared as flat navigation paths, nested automatically
//! - Units of work that batch writes into a single flush
//! - An in-memory data context for tests (`memory` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stow::prelude::*;
//! use stow::memory::MemoryContext;
//!
//! #[derive(Clone)]
//! struct Order {
//!     id: i64,
//!     customer: Option<Customer>,
//! }
//!
//! impl Entity for Order {
//!     const ENTITY_NAME: &'static str = "Order";
//!
//!     fn key(&self) -> Option<EntityKey> {
//!         Some(self.id.into())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QueryError> {
//!     let repository = Repository::new(MemoryContext::new());
//!
//!     repository
//!         .transaction(|repo| async move {
//!             repo.add(Order { id: 1, customer: None }).await?;
//!             repo.add(Order { id: 2, customer: None }).await
//!         })
//!         .await?;
//!
//!     let order = repository
//!         .include(Navigation::<Order, Customer>::reference("customer"))
//!         .get_first(|o: &Order| o.id == 2)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Repository, navigation and resolver types.
pub mod query {
    pub use stow_query::*;
}

/// In-memory data context.
#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
pub mod memory {
    pub use stow_memory::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use stow_query::prelude::*;

    #[cfg(feature = "memory")]
    pub use stow_memory::MemoryContext;
}

// Re-export key types at the crate root
pub use stow_query::{
    DataContext, Entity, EntityKey, ErrorCode, Navigation, QueryError, QueryOptions, QueryResult,
    ReadRepository, Repository, RepositoryConfig,
};
