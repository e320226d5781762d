//! The in-memory data context.

use std::collections::VecDeque;
use std::fmt;

use futures::future;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use stow_query::{
    BoxFuture, DataContext, Entity, EntityKey, EntityKind, Predicate, Query, QueryError,
    QueryResult,
};

use crate::config::MemoryConfig;
use crate::stats::{AtomicMemoryStats, ExecutedQuery, MemoryStats, ReadKind};
use crate::table::Tables;

type ApplyFn = Box<dyn Fn(&mut Tables) -> QueryResult<usize> + Send + Sync>;

/// A staged write, applied on the next flush.
struct Change {
    entity: &'static str,
    kind: ChangeKind,
    apply: ApplyFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Insert,
    Delete,
    DeleteWhere,
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("entity", &self.entity)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A [`DataContext`] that keeps every table in process memory.
///
/// Writes are staged and only become visible to reads after
/// [`save_changes`](DataContext::save_changes). A flush applies every staged
/// change in order, or none of them: on failure the store is left untouched
/// and the changes stay staged.
///
/// Navigation data lives inside the entities themselves, so load
/// instructions are validated and recorded but nothing extra is fetched.
///
/// ```rust
/// use stow_memory::MemoryContext;
/// use stow_query::{DataContext, Entity, EntityKey};
///
/// #[derive(Clone)]
/// struct User {
///     id: i64,
/// }
///
/// impl Entity for User {
///     const ENTITY_NAME: &'static str = "User";
///
///     fn key(&self) -> Option<EntityKey> {
///         Some(self.id.into())
///     }
/// }
///
/// # futures::executor::block_on(async {
/// let context = MemoryContext::new();
/// context.add(User { id: 1 }).await.unwrap();
/// assert_eq!(context.count::<User>(), 0);
///
/// context.save_changes().await.unwrap();
/// assert_eq!(context.count::<User>(), 1);
/// # });
/// ```
#[derive(Default)]
pub struct MemoryContext {
    config: MemoryConfig,
    tables: RwLock<Tables>,
    pending: Mutex<Vec<Change>>,
    history: Mutex<VecDeque<ExecutedQuery>>,
    stats: AtomicMemoryStats,
}

impl MemoryContext {
    /// Create an empty context with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context with an explicit configuration.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Insert rows directly into the store, bypassing the staging area.
    pub fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) -> QueryResult<usize> {
        let mut tables = self.tables.write();
        let mut working = tables.clone();
        let table = working.get_mut::<T>()?;

        let mut inserted = 0;
        for row in rows {
            table.insert(row)?;
            inserted += 1;
        }

        *tables = working;
        debug!(entity = T::ENTITY_NAME, inserted, "Seeded rows");
        Ok(inserted)
    }

    /// Snapshot of the persisted rows of `T`, in insertion order.
    pub fn rows<T: Entity>(&self) -> Vec<T> {
        self.tables
            .read()
            .get::<T>()
            .map(|table| table.rows().to_vec())
            .unwrap_or_default()
    }

    /// Number of persisted rows of `T`.
    pub fn count<T: Entity>(&self) -> usize {
        self.tables.read().count::<T>()
    }

    /// Number of staged changes awaiting a flush.
    pub fn pending_changes(&self) -> usize {
        self.pending.lock().len()
    }

    /// Executed reads, oldest first.
    pub fn history(&self) -> Vec<ExecutedQuery> {
        self.history.lock().iter().cloned().collect()
    }

    /// The most recent read.
    pub fn last_query(&self) -> Option<ExecutedQuery> {
        self.history.lock().back().cloned()
    }

    /// Forget the read history.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Counter snapshot.
    pub fn stats(&self) -> MemoryStats {
        self.stats.snapshot()
    }

    fn stage(&self, changes: Vec<Change>) {
        let count = changes.len();
        if count == 0 {
            return;
        }
        trace!(entity = changes[0].entity, count, "Changes staged");
        self.pending.lock().extend(changes);
        self.stats.record_staged(count);
    }

    fn insert_change<T: Entity>(item: T) -> Change {
        Change {
            entity: T::ENTITY_NAME,
            kind: ChangeKind::Insert,
            apply: Box::new(move |tables: &mut Tables| -> QueryResult<usize> {
                tables.get_mut::<T>()?.insert(item.clone())?;
                Ok(1)
            }),
        }
    }

    fn delete_change<T: Entity>(item: &T) -> QueryResult<Change> {
        let key = item.key().ok_or_else(|| {
            QueryError::unsupported("delete", T::ENTITY_NAME).with_suggestion(format!(
                "Implement Entity::key for {} to delete by item, or delete by predicate",
                T::ENTITY_NAME
            ))
        })?;

        Ok(Self::key_change::<T>(key))
    }

    fn key_change<T: Entity>(key: EntityKey) -> Change {
        Change {
            entity: T::ENTITY_NAME,
            kind: ChangeKind::Delete,
            apply: Box::new(move |tables: &mut Tables| -> QueryResult<usize> {
                Ok(tables.get_mut::<T>()?.remove_key(&key))
            }),
        }
    }

    /// Matches `predicate` against the persisted rows now, so rows staged
    /// later in the same unit of work are never swept up. Keyless rows cannot
    /// be addressed individually and are matched again when the change is
    /// applied.
    fn delete_matching_changes<T: Entity>(&self, predicate: Predicate<T>) -> Vec<Change> {
        let tables = self.tables.read();
        let Some(table) = tables.get::<T>() else {
            return Vec::new();
        };

        let mut keyless = false;
        let mut changes: Vec<Change> = table
            .rows()
            .iter()
            .filter(|row| predicate.matches(row))
            .filter_map(|row| {
                let key = row.key();
                keyless |= key.is_none();
                key
            })
            .map(Self::key_change::<T>)
            .collect();

        if keyless {
            let keyless_rows = predicate.and(Predicate::new(|row: &T| row.key().is_none()));
            changes.push(Change {
                entity: T::ENTITY_NAME,
                kind: ChangeKind::DeleteWhere,
                apply: Box::new(move |tables: &mut Tables| -> QueryResult<usize> {
                    Ok(tables.get_mut::<T>()?.remove_matching(&keyless_rows))
                }),
            });
        }
        changes
    }

    fn apply_pending(&self) -> QueryResult<usize> {
        let changes = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tables = self.tables.write();
        let mut working = tables.clone();

        let outcome = changes.iter().try_fold(0, |affected, change| {
            (change.apply)(&mut working)
                .map(|rows| affected + rows)
                .map_err(|err| (change.entity, change.kind, err))
        });

        match outcome {
            Ok(affected) => {
                *tables = working;
                self.stats.record_flush(affected);
                debug!(changes = changes.len(), affected, "Changes flushed");
                Ok(affected)
            }
            Err((entity, kind, err)) => {
                debug!(entity, kind = ?kind, error = %err, "Flush failed");
                self.stats.record_failed_flush();

                // Put the batch back ahead of anything staged meanwhile
                let mut pending = self.pending.lock();
                let later = std::mem::replace(&mut *pending, changes);
                pending.extend(later);
                Err(err)
            }
        }
    }

    fn read<T: Entity>(&self, kind: ReadKind, query: &Query<T>) -> QueryResult<Vec<T>> {
        if self.config.strict_includes {
            let queried = EntityKind::of::<T>();
            if let Some(stray) = query.base_includes().find(|i| i.path().source() != queried) {
                return Err(QueryError::invalid_include(T::ENTITY_NAME, stray.path().to_string()));
            }
        }

        self.record(ExecutedQuery {
            entity: T::ENTITY_NAME,
            kind,
            tracking: query.tracking(),
            includes: query.includes().to_vec(),
        });

        let tables = self.tables.read();
        let Some(table) = tables.get::<T>() else {
            return Ok(Vec::new());
        };

        let matches = table.rows().iter().filter(|row| query.matches(row));
        Ok(match kind {
            ReadKind::All => matches.cloned().collect(),
            ReadKind::First | ReadKind::Any => matches.take(1).cloned().collect(),
        })
    }

    fn record(&self, query: ExecutedQuery) {
        self.stats.record_query();
        stow_query::stow_debug!(query = %query, "Query executed");

        if !self.config.record_queries {
            return;
        }
        let mut history = self.history.lock();
        history.push_back(query);
        if let Some(limit) = self.config.history_limit {
            while history.len() > limit {
                history.pop_front();
            }
        }
    }
}

impl fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryContext")
            .field("config", &self.config)
            .field("pending", &self.pending_changes())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl DataContext for MemoryContext {
    fn add<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<T>> {
        self.stage(vec![Self::insert_change(item.clone())]);
        Box::pin(future::ready(Ok(item)))
    }

    fn add_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>> {
        self.stage(items.into_iter().map(Self::insert_change).collect());
        Box::pin(future::ready(Ok(())))
    }

    fn remove<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<()>> {
        let result = Self::delete_change(&item).map(|change| self.stage(vec![change]));
        Box::pin(future::ready(result))
    }

    fn remove_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>> {
        // Nothing is staged unless every item can be deleted
        let result = items
            .iter()
            .map(Self::delete_change)
            .collect::<QueryResult<Vec<_>>>()
            .map(|changes| self.stage(changes));
        Box::pin(future::ready(result))
    }

    fn remove_where<T: Entity>(&self, predicate: Predicate<T>) -> BoxFuture<'_, QueryResult<()>> {
        let changes = self.delete_matching_changes(predicate);
        self.stage(changes);
        Box::pin(future::ready(Ok(())))
    }

    fn fetch_first<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Option<T>>> {
        let result = self
            .read(ReadKind::First, &query)
            .map(|rows| rows.into_iter().next());
        Box::pin(future::ready(result))
    }

    fn fetch_all<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Vec<T>>> {
        Box::pin(future::ready(self.read(ReadKind::All, &query)))
    }

    fn fetch_any<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<bool>> {
        let result = self.read(ReadKind::Any, &query).map(|rows| !rows.is_empty());
        Box::pin(future::ready(result))
    }

    fn save_changes(&self) -> BoxFuture<'_, QueryResult<usize>> {
        Box::pin(future::ready(self.apply_pending()))
    }

    fn discard_changes(&self) -> BoxFuture<'_, QueryResult<()>> {
        let dropped = std::mem::take(&mut *self.pending.lock()).len();
        if dropped > 0 {
            self.stats.record_discard(dropped);
            debug!(dropped, "Staged changes discarded");
        }
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stow_query::{EntityKey, ErrorCode, Navigation, QueryOptions, Tracking};

    #[derive(Clone, Debug, PartialEq)]
    struct User {
        id: i64,
        name: &'static str,
    }

    impl Entity for User {
        const ENTITY_NAME: &'static str = "User";

        fn key(&self) -> Option<EntityKey> {
            Some(self.id.into())
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Post {
        author: i64,
    }

    impl Entity for Post {
        const ENTITY_NAME: &'static str = "Post";
    }

    fn user(id: i64, name: &'static str) -> User {
        User { id, name }
    }

    fn all<T>() -> Query<T> {
        Query::new(Predicate::always())
    }

    #[tokio::test]
    async fn test_reads_see_only_flushed_rows() {
        let context = MemoryContext::new();
        context.add(user(1, "ada")).await.unwrap();

        assert!(context.fetch_all(all::<User>()).await.unwrap().is_empty());
        assert_eq!(context.pending_changes(), 1);

        assert_eq!(context.save_changes().await.unwrap(), 1);
        assert_eq!(context.fetch_all(all::<User>()).await.unwrap(), vec![user(1, "ada")]);
        assert_eq!(context.pending_changes(), 0);
    }

    #[tokio::test]
    async fn test_save_with_nothing_staged() {
        let context = MemoryContext::new();
        assert_eq!(context.save_changes().await.unwrap(), 0);
        assert_eq!(context.stats().flushes, 0);
    }

    #[tokio::test]
    async fn test_fetch_first_and_any() {
        let context = MemoryContext::new();
        context.seed([user(1, "ada"), user(2, "bob")]).unwrap();

        let bob = context
            .fetch_first(Query::new(Predicate::new(|u: &User| u.name == "bob")))
            .await
            .unwrap();
        assert_eq!(bob, Some(user(2, "bob")));

        let nobody = context
            .fetch_any(Query::new(Predicate::new(|u: &User| u.id > 10)))
            .await
            .unwrap();
        assert!(!nobody);
    }

    #[tokio::test]
    async fn test_duplicate_key_fails_whole_flush() {
        let context = MemoryContext::new();
        context.seed([user(1, "ada")]).unwrap();

        context
            .add_range(vec![user(2, "bob"), user(1, "again")])
            .await
            .unwrap();
        let err = context.save_changes().await.unwrap_err();

        assert_eq!(err.code, ErrorCode::UniqueConstraint);
        assert_eq!(context.count::<User>(), 1);
        assert_eq!(context.pending_changes(), 2);
        assert_eq!(context.stats().failed_flushes, 1);

        context.discard_changes().await.unwrap();
        assert_eq!(context.pending_changes(), 0);
        assert_eq!(context.stats().discarded, 2);
    }

    #[tokio::test]
    async fn test_delete_by_key() {
        let context = MemoryContext::new();
        context.seed([user(1, "ada"), user(2, "bob"), user(3, "cy")]).unwrap();

        context.remove(user(2, "bob")).await.unwrap();
        context.remove_range(vec![user(3, "cy")]).await.unwrap();
        assert_eq!(context.save_changes().await.unwrap(), 2);

        assert_eq!(context.rows::<User>(), vec![user(1, "ada")]);
    }

    #[tokio::test]
    async fn test_delete_without_key_is_unsupported() {
        let context = MemoryContext::new();
        context.seed([Post { author: 1 }]).unwrap();

        let err = context.remove(Post { author: 1 }).await.unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(context.pending_changes(), 0);

        let err = context.remove_range(vec![Post { author: 1 }]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unsupported);
    }

    #[tokio::test]
    async fn test_remove_where_works_without_key() {
        let context = MemoryContext::new();
        context
            .seed([Post { author: 1 }, Post { author: 2 }, Post { author: 1 }])
            .unwrap();

        context
            .remove_where(Predicate::new(|p: &Post| p.author == 1))
            .await
            .unwrap();
        assert_eq!(context.save_changes().await.unwrap(), 2);
        assert_eq!(context.rows::<Post>(), vec![Post { author: 2 }]);
    }

    #[tokio::test]
    async fn test_remove_where_matches_persisted_rows_only() {
        let context = MemoryContext::new();
        context.seed([user(1, "ada"), user(2, "bob")]).unwrap();

        context.add(user(3, "ada")).await.unwrap();
        context
            .remove_where(Predicate::new(|u: &User| u.name == "ada"))
            .await
            .unwrap();
        assert_eq!(context.pending_changes(), 2);

        assert_eq!(context.save_changes().await.unwrap(), 2);
        assert_eq!(context.rows::<User>(), vec![user(2, "bob"), user(3, "ada")]);
    }

    #[tokio::test]
    async fn test_remove_where_without_matches_stages_nothing() {
        let context = MemoryContext::new();
        context
            .remove_where(Predicate::new(|u: &User| u.id > 0))
            .await
            .unwrap();
        assert_eq!(context.pending_changes(), 0);
    }

    #[tokio::test]
    async fn test_includes_recorded() {
        let context = MemoryContext::new();
        let plan = QueryOptions::new()
            .include(Navigation::<User, Post>::collection("posts"))
            .resolve()
            .unwrap();

        let query = all::<User>().with_tracking(Tracking::Tracking).with_plan(&plan);
        context.fetch_all(query).await.unwrap();

        let executed = context.last_query().unwrap();
        assert_eq!(executed.kind, ReadKind::All);
        assert_eq!(executed.tracking, Tracking::Tracking);
        assert_eq!(executed.relations(), vec!["posts"]);
        assert_eq!(executed.to_string(), "all User.include(User.posts[])");
    }

    #[tokio::test]
    async fn test_stray_base_include_rejected() {
        let context = MemoryContext::new();
        let plan = QueryOptions::new()
            .include(Navigation::<Post, User>::reference("author"))
            .resolve()
            .unwrap();

        let err = context
            .fetch_first(all::<User>().with_plan(&plan))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInclude);
        assert!(context.history().is_empty());

        let lenient = MemoryContext::with_config(MemoryConfig::new().strict_includes(false));
        assert!(lenient.fetch_first(all::<User>().with_plan(&plan)).await.is_ok());
    }

    #[tokio::test]
    async fn test_history_limit() {
        let context = MemoryContext::with_config(MemoryConfig::new().history_limit(Some(2)));
        for _ in 0..3 {
            context.fetch_any(all::<User>()).await.unwrap();
        }
        assert_eq!(context.history().len(), 2);
        assert_eq!(context.stats().queries, 3);

        context.clear_history();
        assert!(context.last_query().is_none());
    }

    #[test]
    fn test_seed_is_all_or_nothing() {
        let context = MemoryContext::new();
        let err = context
            .seed([user(1, "ada"), user(1, "dup")])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);
        assert_eq!(context.count::<User>(), 0);
    }
}
