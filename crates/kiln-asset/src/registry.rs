//! Copy-on-write keyed registries
//!
//! Dependencies and connected files of an asset are held in a [`Registry`].
//! A child asset starts with a [`Registry::share`]d handle onto its parent's
//! entries and only pays for a copy when it adds something of its own.

use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::Arc;

/// How a registry handle relates to the entries it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Entries were built for (or detached into) this handle
    Owned,
    /// Entries are borrowed from another registry until the first mutation
    Shared,
}

/// Insertion-ordered map with explicit copy-on-write sharing
#[derive(Debug)]
pub struct Registry<K, V> {
    entries: Arc<IndexMap<K, V>>,
    ownership: Ownership,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(IndexMap::new()),
            ownership: Ownership::Owned,
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Ownership::Shared`] handle onto the same entries
    #[must_use]
    pub fn share(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ownership: Ownership::Shared,
        }
    }

    /// Current ownership of the entries
    #[inline]
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether both handles point at the very same entries
    #[inline]
    #[must_use]
    pub fn shares_entries_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Insert or replace an entry (last write wins)
    ///
    /// A shared handle detaches first; entries held by other handles are never
    /// modified.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.ownership == Ownership::Shared {
            tracing::trace!(entries = self.entries.len(), "detaching shared registry");
            self.entries = Arc::new(IndexMap::clone(&self.entries));
            self.ownership = Ownership::Owned;
        }
        Arc::make_mut(&mut self.entries).insert(key, value)
    }

    /// Look up an entry
    #[inline]
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Whether an entry exists for key
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Iterate values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Entries as an order-preserving list of pairs
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(K, V)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Registry<K, V>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: Arc::new(iter.into_iter().collect()),
            ownership: Ownership::Owned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(pairs: &[(&str, u32)]) -> Registry<String, u32> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn from_iter_is_owned_and_ordered() {
        let reg = registry(&[("b", 1), ("a", 2)]);
        assert_eq!(reg.ownership(), Ownership::Owned);
        let keys: Vec<_> = reg.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn share_points_at_same_entries() {
        let parent = registry(&[("a", 1)]);
        let child = parent.share();
        assert_eq!(child.ownership(), Ownership::Shared);
        assert!(child.shares_entries_with(&parent));
        assert_eq!(child.get(&"a".to_string()), Some(&1));
    }

    #[test]
    fn insert_through_shared_handle_detaches() {
        let parent = registry(&[("a", 1)]);
        let mut child = parent.share();

        child.insert("b".to_string(), 2);

        assert_eq!(child.ownership(), Ownership::Owned);
        assert!(!child.shares_entries_with(&parent));
        assert_eq!(child.len(), 2);
        assert_eq!(parent.len(), 1);
        assert!(!parent.contains_key(&"b".to_string()));
    }

    #[test]
    fn parent_mutation_does_not_leak_into_child() {
        let mut parent = registry(&[("a", 1)]);
        let child = parent.share();

        parent.insert("z".to_string(), 9);

        assert_eq!(child.len(), 1);
        assert!(!child.contains_key(&"z".to_string()));
    }

    #[test]
    fn last_write_wins() {
        let mut reg = registry(&[("a", 1)]);
        assert_eq!(reg.insert("a".to_string(), 5), Some(1));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.to_pairs(), vec![("a".to_string(), 5)]);
    }
}
