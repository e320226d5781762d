//! The repository facade.
//!
//! A [`Repository`] wraps a [`DataContext`] and offers one uniform surface
//! for every entity type: writes that flush unless a unit of work is open,
//! predicate reads with optional eager loading, and unit-of-work scopes that
//! batch writes into a single flush.
//!
//! ```rust,ignore
//! let repository = Repository::new(context);
//!
//! // Flushed immediately
//! let customer = repository.add(Customer::new("Ada")).await?;
//!
//! // Eager-load along declared paths; the declaration order does not matter
//! let order = repository
//!     .include(Navigation::<Customer, Address>::reference("address"))
//!     .include(Navigation::<Order, Customer>::reference("customer"))
//!     .get_first(|o: &Order| o.id == 7)
//!     .await?;
//!
//! // The next read starts with no includes
//! let any = repository.is_any(|o: &Order| o.total > 100).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use crate::config::RepositoryConfig;
use crate::error::QueryResult;
use crate::predicate::Predicate;
use crate::query::{Query, QueryOptions, Tracking};
use crate::relations::Navigation;
use crate::traits::{DataContext, Entity};
use crate::transaction::FlushPolicy;

struct Session<C> {
    context: C,
    flush: FlushPolicy,
    config: RepositoryConfig,
}

/// Generic repository over a data context.
///
/// Clones share one session: the same context and the same flush policy.
pub struct Repository<C> {
    session: Arc<Session<C>>,
}

impl<C> Clone for Repository<C> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<C> std::fmt::Debug for Repository<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("scope_depth", &self.session.flush.depth())
            .field("config", &self.session.config)
            .finish_non_exhaustive()
    }
}

impl<C: DataContext> Repository<C> {
    /// Create a repository with the default configuration.
    pub fn new(context: C) -> Self {
        Self::with_config(context, RepositoryConfig::default())
    }

    /// Create a repository with an explicit configuration.
    pub fn with_config(context: C, config: RepositoryConfig) -> Self {
        Self {
            session: Arc::new(Session {
                context,
                flush: FlushPolicy::new(),
                config,
            }),
        }
    }

    /// The underlying data context.
    pub fn context(&self) -> &C {
        &self.session.context
    }

    /// The active configuration.
    pub fn config(&self) -> &RepositoryConfig {
        &self.session.config
    }

    /// Check if a write made now would be flushed immediately.
    pub fn is_flush_enabled(&self) -> bool {
        self.session.config.unit_of_work.auto_flush && self.session.flush.is_enabled()
    }

    /// Number of open unit-of-work scopes.
    pub fn scope_depth(&self) -> usize {
        self.session.flush.depth()
    }

    /// Persist every staged write now, regardless of open scopes.
    pub async fn flush(&self) -> QueryResult<usize> {
        let applied = self.session.context.save_changes().await?;
        trace!(applied, "Changes flushed");
        Ok(applied)
    }

    // A failed automatic flush is rolled back like a failed unit of work, so
    // the rejected write does not resurface on the next flush.
    async fn flush_if_enabled(&self) -> QueryResult<()> {
        if !self.is_flush_enabled() {
            return Ok(());
        }
        if let Err(err) = self.flush().await {
            self.rollback().await;
            debug!(error = %err, "Automatic flush rolled back");
            return Err(err);
        }
        Ok(())
    }

    // ==================== Writes ====================

    /// Insert one entity and return the stored form.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME))]
    pub async fn add<T: Entity>(&self, item: T) -> QueryResult<T> {
        let stored = self.session.context.add(item).await?;
        self.flush_if_enabled().await?;
        Ok(stored)
    }

    /// Insert many entities with a single flush.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME, count = items.len()))]
    pub async fn add_range<T: Entity>(&self, items: Vec<T>) -> QueryResult<Vec<T>> {
        self.session.context.add_range(items.clone()).await?;
        self.flush_if_enabled().await?;
        Ok(items)
    }

    /// Remove one entity.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME))]
    pub async fn delete<T: Entity>(&self, item: T) -> QueryResult<()> {
        self.session.context.remove(item).await?;
        self.flush_if_enabled().await
    }

    /// Remove many entities with a single flush.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME, count = items.len()))]
    pub async fn delete_range<T: Entity>(&self, items: Vec<T>) -> QueryResult<()> {
        self.session.context.remove_range(items).await?;
        self.flush_if_enabled().await
    }

    /// Remove every entity matching the predicate.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME))]
    pub async fn delete_where<T, F>(&self, predicate: F) -> QueryResult<()>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.session
            .context
            .remove_where(Predicate::new(predicate))
            .await?;
        self.flush_if_enabled().await
    }

    // ==================== Reads ====================

    /// Start an include batch for the next read.
    pub fn include<S: Entity, T: Entity>(&self, navigation: Navigation<S, T>) -> Includes<'_, C> {
        Includes {
            repository: self,
            options: QueryOptions::new().include(navigation),
        }
    }

    /// The first entity matching the predicate, or `None`.
    pub async fn get_first<T, F>(&self, predicate: F) -> QueryResult<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.get_first_with(&QueryOptions::new(), predicate).await
    }

    /// Every entity matching the predicate. Matching nothing is not an error.
    pub async fn get_where<T, F>(&self, predicate: F) -> QueryResult<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.get_where_with(&QueryOptions::new(), predicate).await
    }

    /// Check if any entity matches the predicate.
    pub async fn is_any<T, F>(&self, predicate: F) -> QueryResult<bool>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.is_any_with(&QueryOptions::new(), predicate).await
    }

    /// [`get_first`](Self::get_first) with explicit options.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME, includes = options.len()))]
    pub async fn get_first_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let query = self.prepare(options, Predicate::new(predicate))?;
        self.session.context.fetch_first(query).await
    }

    /// [`get_where`](Self::get_where) with explicit options.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME, includes = options.len()))]
    pub async fn get_where_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let query = self.prepare(options, Predicate::new(predicate))?;
        self.session.context.fetch_all(query).await
    }

    /// [`is_any`](Self::is_any) with explicit options.
    #[instrument(skip_all, fields(entity = T::ENTITY_NAME, includes = options.len()))]
    pub async fn is_any_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<bool>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let query = self.prepare(options, Predicate::new(predicate))?;
        self.session.context.fetch_any(query).await
    }

    fn prepare<T: Entity>(&self, options: &QueryOptions, predicate: Predicate<T>) -> QueryResult<Query<T>> {
        let plan = options.resolve()?;
        if self.session.config.debug.log_plans && !plan.is_empty() {
            debug!(entity = T::ENTITY_NAME, plan = %plan, "Loading plan resolved");
        }

        let tracking: Tracking = options
            .tracking_mode()
            .unwrap_or(self.session.config.query.tracking);

        Ok(Query::new(predicate).with_tracking(tracking).with_plan(&plan))
    }

    // ==================== Unit of work ====================

    /// Run `work` as one unit of work.
    ///
    /// Writes made through the repository handed to `work` are not flushed
    /// individually. When the outermost unit of work returns `Ok`, staged
    /// changes are flushed once. When it returns `Err`, or the final flush
    /// fails, staged changes are discarded (unless
    /// `unit_of_work.discard_on_failure` is off) and the error is returned
    /// unchanged. Nested calls join the enclosing unit.
    ///
    /// Automatic flushing is restored however `work` exits.
    pub async fn transaction<F, Fut, R>(&self, work: F) -> QueryResult<R>
    where
        F: FnOnce(Repository<C>) -> Fut,
        Fut: Future<Output = QueryResult<R>>,
    {
        let scope = self.session.flush.suspend();
        let outermost = scope.is_outermost();
        let depth = scope.depth();

        let result = work(self.clone()).await;
        drop(scope);

        if !outermost {
            trace!(depth, ok = result.is_ok(), "Nested unit of work finished");
            return result;
        }

        let outcome = match result {
            Ok(value) => self.flush().await.map(|applied| (value, applied)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok((value, applied)) => {
                debug!(applied, "Unit of work committed");
                Ok(value)
            }
            Err(err) => {
                self.rollback().await;
                debug!(error = %err, "Unit of work rolled back");
                Err(err)
            }
        }
    }

    async fn rollback(&self) {
        if !self.session.config.unit_of_work.discard_on_failure {
            return;
        }
        if let Err(err) = self.session.context.discard_changes().await {
            warn!(error = %err, "Failed to discard staged changes");
        }
    }

    /// A read-only view over the same session.
    pub fn read_only(&self) -> ReadRepository<C> {
        ReadRepository { inner: self.clone() }
    }
}

/// An include batch bound to one read.
///
/// Created by [`Repository::include`]. The batch is consumed by the read, so
/// it never leaks into a later query.
#[must_use = "includes only apply to a read made through this builder"]
pub struct Includes<'r, C> {
    repository: &'r Repository<C>,
    options: QueryOptions,
}

impl<'r, C: DataContext> Includes<'r, C> {
    /// Add another navigation path to the batch.
    pub fn include<S: Entity, T: Entity>(mut self, navigation: Navigation<S, T>) -> Self {
        self.options = self.options.include(navigation);
        self
    }

    /// Set the tracking mode for the read.
    pub fn tracking(mut self, tracking: Tracking) -> Self {
        self.options = self.options.tracking(tracking);
        self
    }

    /// The options accumulated so far.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Read the first match with the batch applied.
    pub async fn get_first<T, F>(self, predicate: F) -> QueryResult<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.repository.get_first_with(&self.options, predicate).await
    }

    /// Read every match with the batch applied.
    pub async fn get_where<T, F>(self, predicate: F) -> QueryResult<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.repository.get_where_with(&self.options, predicate).await
    }

    /// Existence check with the batch applied.
    pub async fn is_any<T, F>(self, predicate: F) -> QueryResult<bool>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.repository.is_any_with(&self.options, predicate).await
    }
}

impl<C> std::fmt::Debug for Includes<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Includes")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Read-only repository: includes and predicate reads, no writes.
pub struct ReadRepository<C> {
    inner: Repository<C>,
}

impl<C: DataContext> ReadRepository<C> {
    /// Create a read-only repository with the default configuration.
    pub fn new(context: C) -> Self {
        Repository::new(context).read_only()
    }

    /// The underlying data context.
    pub fn context(&self) -> &C {
        self.inner.context()
    }

    /// Start an include batch for the next read.
    pub fn include<S: Entity, T: Entity>(&self, navigation: Navigation<S, T>) -> Includes<'_, C> {
        self.inner.include(navigation)
    }

    /// The first entity matching the predicate, or `None`.
    pub async fn get_first<T, F>(&self, predicate: F) -> QueryResult<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.get_first(predicate).await
    }

    /// Every entity matching the predicate.
    pub async fn get_where<T, F>(&self, predicate: F) -> QueryResult<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.get_where(predicate).await
    }

    /// Check if any entity matches the predicate.
    pub async fn is_any<T, F>(&self, predicate: F) -> QueryResult<bool>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.is_any(predicate).await
    }

    /// [`get_first`](Self::get_first) with explicit options.
    pub async fn get_first_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.get_first_with(options, predicate).await
    }

    /// [`get_where`](Self::get_where) with explicit options.
    pub async fn get_where_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.get_where_with(options, predicate).await
    }

    /// [`is_any`](Self::is_any) with explicit options.
    pub async fn is_any_with<T, F>(&self, options: &QueryOptions, predicate: F) -> QueryResult<bool>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.inner.is_any_with(options, predicate).await
    }
}

impl<C> Clone for ReadRepository<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ReadRepository<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadRepository").finish_non_exhaustive()
    }
}
