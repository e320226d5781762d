//! Type-erased row storage, one table per entity type.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use stow_query::{Entity, EntityKey, Predicate, QueryError, QueryResult};

pub(crate) trait AnyTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_table(&self) -> Box<dyn AnyTable>;
}

/// Persisted rows of one entity type, in insertion order.
#[derive(Debug, Clone)]
pub(crate) struct Table<T> {
    rows: Vec<T>,
}

impl<T: Entity> Table<T> {
    fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub(crate) fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Keyed rows must be unique; keyless rows never conflict.
    pub(crate) fn insert(&mut self, item: T) -> QueryResult<()> {
        if let Some(key) = item.key() {
            if self.rows.iter().any(|row| row.key().as_ref() == Some(&key)) {
                return Err(QueryError::unique_violation(T::ENTITY_NAME, key));
            }
        }
        self.rows.push(item);
        Ok(())
    }

    pub(crate) fn remove_key(&mut self, key: &EntityKey) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.key().as_ref() != Some(key));
        before - self.rows.len()
    }

    pub(crate) fn remove_matching(&mut self, predicate: &Predicate<T>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate.matches(row));
        before - self.rows.len()
    }
}

impl<T: Entity> AnyTable for Table<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_table(&self) -> Box<dyn AnyTable> {
        Box::new(self.clone())
    }
}

/// Every table in the store.
#[derive(Default)]
pub(crate) struct Tables {
    tables: HashMap<TypeId, Box<dyn AnyTable>>,
}

impl Tables {
    pub(crate) fn get<T: Entity>(&self) -> Option<&Table<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|table| table.as_any().downcast_ref::<Table<T>>())
    }

    pub(crate) fn get_mut<T: Entity>(&mut self) -> QueryResult<&mut Table<T>> {
        self.tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Table::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Table<T>>()
            .ok_or_else(|| QueryError::internal(format!("table for {} has the wrong row type", T::ENTITY_NAME)))
    }

    pub(crate) fn count<T: Entity>(&self) -> usize {
        self.get::<T>().map_or(0, |table| table.rows().len())
    }
}

impl Clone for Tables {
    fn clone(&self) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .map(|(id, table)| (*id, table.clone_table()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_query::ErrorCode;

    #[derive(Clone, Debug, PartialEq)]
    struct User {
        id: i64,
    }

    impl Entity for User {
        const ENTITY_NAME: &'static str = "User";

        fn key(&self) -> Option<EntityKey> {
            Some(self.id.into())
        }
    }

    #[derive(Clone)]
    struct Note;

    impl Entity for Note {
        const ENTITY_NAME: &'static str = "Note";
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let mut tables = Tables::default();
        let users = tables.get_mut::<User>().unwrap();
        users.insert(User { id: 1 }).unwrap();

        let err = users.insert(User { id: 1 }).unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);
        assert_eq!(tables.count::<User>(), 1);
    }

    #[test]
    fn test_keyless_rows_never_conflict() {
        let mut tables = Tables::default();
        let notes = tables.get_mut::<Note>().unwrap();
        notes.insert(Note).unwrap();
        notes.insert(Note).unwrap();
        assert_eq!(tables.count::<Note>(), 2);
    }

    #[test]
    fn test_remove() {
        let mut tables = Tables::default();
        let users = tables.get_mut::<User>().unwrap();
        for id in 1..=4 {
            users.insert(User { id }).unwrap();
        }

        assert_eq!(users.remove_key(&EntityKey::Int(2)), 1);
        assert_eq!(users.remove_key(&EntityKey::Int(2)), 0);
        assert_eq!(users.remove_matching(&Predicate::new(|u: &User| u.id > 2)), 2);
        assert_eq!(users.rows(), &[User { id: 1 }]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut tables = Tables::default();
        tables.get_mut::<User>().unwrap().insert(User { id: 1 }).unwrap();

        let mut copy = tables.clone();
        copy.get_mut::<User>().unwrap().insert(User { id: 2 }).unwrap();

        assert_eq!(tables.count::<User>(), 1);
        assert_eq!(copy.count::<User>(), 2);
    }

    #[test]
    fn test_missing_table_is_empty() {
        let tables = Tables::default();
        assert!(tables.get::<User>().is_none());
        assert_eq!(tables.count::<User>(), 0);
    }
}
