//! Core traits: entity identity and the data-context seam.

use std::any::TypeId;
use std::fmt;

use smol_str::SmolStr;
use uuid::Uuid;

use crate::error::QueryResult;
use crate::predicate::Predicate;
use crate::query::Query;

/// A boxed future used by [`DataContext`] methods.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// A record type managed through a repository.
///
/// The repository never looks inside an entity; it only needs a stable name
/// for diagnostics. Contexts that delete by item use [`Entity::key`].
///
/// ```rust
/// use stow_query::{Entity, EntityKey};
///
/// #[derive(Clone)]
/// struct Customer {
///     id: i64,
/// }
///
/// impl Entity for Customer {
///     const ENTITY_NAME: &'static str = "Customer";
///
///     fn key(&self) -> Option<EntityKey> {
///         Some(self.id.into())
///     }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// The entity name used in logs and errors.
    const ENTITY_NAME: &'static str;

    /// The identity of this record, if it has one.
    fn key(&self) -> Option<EntityKey> {
        None
    }
}

/// Runtime identity of an entity type.
#[derive(Clone, Copy)]
pub struct EntityKind {
    id: TypeId,
    name: &'static str,
}

impl EntityKind {
    /// Get the kind of an entity type.
    pub fn of<E: Entity>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::ENTITY_NAME,
        }
    }

    /// Get the type id.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Get the entity name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether this is the kind of `E`.
    pub fn is<E: Entity>(&self) -> bool {
        self.id == TypeId::of::<E>()
    }
}

// Identity is the type id alone; the name only exists for diagnostics.
impl PartialEq for EntityKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityKind {}

impl std::hash::Hash for EntityKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Primary key value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Integer key.
    Int(i64),
    /// String key.
    String(SmolStr),
    /// UUID key.
    Uuid(Uuid),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "'{}'", v),
            Self::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for EntityKey {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for EntityKey {
    fn from(v: &str) -> Self {
        Self::String(SmolStr::new(v))
    }
}

impl From<String> for EntityKey {
    fn from(v: String) -> Self {
        Self::String(SmolStr::new(v))
    }
}

impl From<Uuid> for EntityKey {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

/// The relational data-access collaborator behind a repository.
///
/// Writes are staged by `add*`/`remove*` and persisted by
/// [`save_changes`](DataContext::save_changes). Reads receive a [`Query`]
/// carrying the predicate, the tracking mode and the load instructions the
/// repository attached to it. Errors are returned to the caller untouched.
pub trait DataContext: Send + Sync {
    /// Stage one entity for insertion and return the stored form.
    fn add<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<T>>;

    /// Stage many entities for insertion.
    fn add_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>>;

    /// Stage one entity for removal.
    fn remove<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<()>>;

    /// Stage many entities for removal.
    fn remove_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>>;

    /// Stage removal of every entity matching the predicate.
    fn remove_where<T: Entity>(&self, predicate: Predicate<T>) -> BoxFuture<'_, QueryResult<()>>;

    /// Return the first entity matching the query, if any.
    fn fetch_first<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Option<T>>>;

    /// Return every entity matching the query.
    fn fetch_all<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Vec<T>>>;

    /// Check whether any entity matches the query.
    fn fetch_any<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<bool>>;

    /// Persist all staged changes and return how many were applied.
    ///
    /// Calling this with nothing staged is a no-op.
    fn save_changes(&self) -> BoxFuture<'_, QueryResult<usize>>;

    /// Drop all staged changes without persisting them.
    fn discard_changes(&self) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

impl<C: DataContext> DataContext for std::sync::Arc<C> {
    fn add<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<T>> {
        (**self).add(item)
    }

    fn add_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>> {
        (**self).add_range(items)
    }

    fn remove<T: Entity>(&self, item: T) -> BoxFuture<'_, QueryResult<()>> {
        (**self).remove(item)
    }

    fn remove_range<T: Entity>(&self, items: Vec<T>) -> BoxFuture<'_, QueryResult<()>> {
        (**self).remove_range(items)
    }

    fn remove_where<T: Entity>(&self, predicate: Predicate<T>) -> BoxFuture<'_, QueryResult<()>> {
        (**self).remove_where(predicate)
    }

    fn fetch_first<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Option<T>>> {
        (**self).fetch_first(query)
    }

    fn fetch_all<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<Vec<T>>> {
        (**self).fetch_all(query)
    }

    fn fetch_any<T: Entity>(&self, query: Query<T>) -> BoxFuture<'_, QueryResult<bool>> {
        (**self).fetch_any(query)
    }

    fn save_changes(&self) -> BoxFuture<'_, QueryResult<usize>> {
        (**self).save_changes()
    }

    fn discard_changes(&self) -> BoxFuture<'_, QueryResult<()>> {
        (**self).discard_changes()
    }
}
