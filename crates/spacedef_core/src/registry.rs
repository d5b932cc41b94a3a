//! Ordered entity storage.
//!
//! Entities are kept in a `Vec` in insertion order. Ids are handed out
//! monotonically, so insertion order is also id order and lookups can use a
//! binary search. Removals compact the vector while walking it in reverse,
//! which keeps iteration order stable for everything that survives.

use serde::{Deserialize, Serialize};

/// An entity that can live in a [`Registry`].
pub trait RegistryEntry {
    /// Raw id of this entity.
    fn entry_id(&self) -> u32;

    /// Called once by [`Registry::insert`] to stamp the new id.
    fn assign_id(&mut self, id: u32);
}

/// Insertion-ordered storage with monotonically increasing ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry<T> {
    items: Vec<T>,
    next_id: u32,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: RegistryEntry> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity, assigning it the next id.
    pub fn insert(&mut self, mut item: T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        item.assign_id(id);
        self.items.push(item);
        id
    }

    fn index_of(&self, id: u32) -> Option<usize> {
        self.items.binary_search_by_key(&id, T::entry_id).ok()
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.index_of(id).map(|index| &self.items[index])
    }

    /// Get a mutable entity by id.
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.index_of(id).map(move |index| &mut self.items[index])
    }

    /// Check whether an id is present.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.index_of(id).is_some()
    }

    /// Remove a single entity by id.
    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.index_of(id).map(|index| self.items.remove(index))
    }

    /// Remove every entity matching `predicate`, walking in reverse.
    ///
    /// Removed entities are returned in their original (ascending id) order.
    pub fn drain_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        for index in (0..self.items.len()).rev() {
            if predicate(&self.items[index]) {
                removed.push(self.items.remove(index));
            }
        }
        removed.reverse();
        removed
    }

    /// Iterate in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably in id order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// All ids in iteration order.
    #[must_use]
    pub fn ids(&self) -> Vec<u32> {
        self.items.iter().map(T::entry_id).collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The entities as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        value: i32,
    }

    impl RegistryEntry for Item {
        fn entry_id(&self) -> u32 {
            self.id
        }

        fn assign_id(&mut self, id: u32) {
            self.id = id;
        }
    }

    fn item(value: i32) -> Item {
        Item { id: 0, value }
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let mut registry = Registry::new();
        let a = registry.insert(item(10));
        let b = registry.insert(item(20));

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(registry.get(b).map(|i| i.value), Some(20));
        assert!(registry.get(99).is_none());
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut registry = Registry::new();
        let a = registry.insert(item(1));
        registry.remove(a);
        let b = registry.insert(item(2));

        assert_ne!(a, b);
        assert!(!registry.contains(a));
    }

    #[test]
    fn test_drain_where_keeps_order() {
        let mut registry = Registry::new();
        for value in 0..6 {
            registry.insert(item(value));
        }

        let removed = registry.drain_where(|i| i.value % 2 == 0);

        assert_eq!(
            removed.iter().map(|i| i.value).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        assert_eq!(
            registry.iter().map(|i| i.value).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        // Lookups still work after compaction
        assert_eq!(registry.get(4).map(|i| i.value), Some(3));
    }
}
