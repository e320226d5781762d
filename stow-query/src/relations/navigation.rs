//! Navigation path declarations.

use std::fmt;
use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::traits::{Entity, EntityKind};

/// Whether a navigation yields one related entity or a collection of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// The relation yields a single entity (e.g., Order has one Customer).
    One,
    /// The relation yields a collection (e.g., Customer has many Orders).
    Many,
}

impl Cardinality {
    /// Check if this relation returns a collection.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::One)
    }
}

/// A type-erased navigation path: a named relation from a source entity
/// type to a target entity type.
///
/// For collection relations the target is the element type, so a path
/// yielding "many Address" matches paths whose source is `Address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationPath {
    relation: SmolStr,
    source: EntityKind,
    target: EntityKind,
    cardinality: Cardinality,
}

impl NavigationPath {
    /// Create a path from its parts.
    pub fn new(
        relation: impl Into<SmolStr>,
        source: EntityKind,
        target: EntityKind,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            relation: relation.into(),
            source,
            target,
            cardinality,
        }
    }

    /// Name of the relation the data context loads.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// The entity type the path starts from.
    pub fn source(&self) -> EntityKind {
        self.source
    }

    /// The entity type the path yields (element type for collections).
    pub fn target(&self) -> EntityKind {
        self.target
    }

    /// Cardinality of the relation.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Check whether `next` can be chained after this path.
    pub fn leads_to(&self, next: &NavigationPath) -> bool {
        self.target == next.source
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.relation)?;
        if self.cardinality.is_many() {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// A typed navigation declaration from `S` to `T`.
///
/// The type parameters are checked at compile time; only the erased
/// [`NavigationPath`] is kept once the path joins a batch.
///
/// ```rust
/// use stow_query::{Entity, Navigation};
///
/// #[derive(Clone)]
/// struct Order;
/// #[derive(Clone)]
/// struct Customer;
///
/// impl Entity for Order {
///     const ENTITY_NAME: &'static str = "Order";
/// }
/// impl Entity for Customer {
///     const ENTITY_NAME: &'static str = "Customer";
/// }
///
/// let customer = Navigation::<Order, Customer>::reference("customer");
/// let orders = Navigation::<Customer, Order>::collection("orders");
///
/// assert_eq!(customer.path().to_string(), "Order.customer");
/// assert_eq!(orders.path().to_string(), "Customer.orders[]");
/// ```
pub struct Navigation<S, T> {
    path: NavigationPath,
    _marker: PhantomData<fn(&S) -> T>,
}

impl<S: Entity, T: Entity> Navigation<S, T> {
    /// Declare a relation yielding a single `T`.
    pub fn reference(relation: impl Into<SmolStr>) -> Self {
        Self::with_cardinality(relation, Cardinality::One)
    }

    /// Declare a relation yielding a collection of `T`.
    pub fn collection(relation: impl Into<SmolStr>) -> Self {
        Self::with_cardinality(relation, Cardinality::Many)
    }

    fn with_cardinality(relation: impl Into<SmolStr>, cardinality: Cardinality) -> Self {
        Self {
            path: NavigationPath::new(
                relation,
                EntityKind::of::<S>(),
                EntityKind::of::<T>(),
                cardinality,
            ),
            _marker: PhantomData,
        }
    }
}

impl<S, T> Navigation<S, T> {
    /// Get the erased path.
    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    /// Convert into the erased path.
    pub fn into_path(self) -> NavigationPath {
        self.path
    }
}

impl<S, T> Clone for Navigation<S, T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, T> fmt::Debug for Navigation<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Navigation").field(&self.path).finish()
    }
}

impl<S, T> From<Navigation<S, T>> for NavigationPath {
    fn from(navigation: Navigation<S, T>) -> Self {
        navigation.path
    }
}
