//! In-memory data context for Stow.
//!
//! This crate provides a [`DataContext`](stow_query::DataContext) that keeps
//! rows in process memory, for tests and prototyping.
//!
//! # Features
//!
//! - One table per entity type, keyed by `TypeId`
//! - Staged writes applied atomically on `save_changes`
//! - Unique keys enforced on flush through [`Entity::key`](stow_query::Entity::key)
//! - Query history and counters for asserting on repository behaviour
//!
//! # Example
//!
//! ```rust,ignore
//! use stow_memory::MemoryContext;
//! use stow_query::Repository;
//!
//! let repository = Repository::new(MemoryContext::new());
//! repository.add(User { id: 1, name: "Ada".into() }).await?;
//!
//! let stats = repository.context().stats();
//! assert_eq!(stats.flushes, 1);
//! ```

pub mod config;
pub mod context;
pub mod stats;
mod table;

pub use config::MemoryConfig;
pub use context::MemoryContext;
pub use stats::{ExecutedQuery, MemoryStats, ReadKind};
