//! FILENAME: core/insensitive/src/mapping.rs
//! PURPOSE: Ordered maps keyed by strings or string tuples, compared
//! case- and space-insensitively.
//! CONTEXT: The store is an ordered index from the adjusted key to a slot
//! holding the caller's original key and the value. Re-inserting an adjusted
//! key overwrites the slot in place, so the newest spelling is displayed while
//! the entry keeps the position of its first insertion.
//!
//! ```
//! use insensitive::InsensitiveTupleMapping;
//!
//! let mut data = InsensitiveTupleMapping::new();
//! data.insert(
//!     vec!["[Business Unit].[UK]".to_string(), "[Scenario].[Worst Case]".to_string()],
//!     1000,
//! );
//! assert_eq!(data[&["[BusinessUnit].[UK]", "[Scenario].[worstcase]"]], 1000);
//! ```

use std::fmt;
use std::ops::Index;

use indexmap::map::Entry;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::error::InsensitiveError;
use crate::key::InsensitiveKey;

/// Original key and value stored under one adjusted key.
#[derive(Debug, Clone, PartialEq)]
struct Slot<K, V> {
    key: K,
    value: V,
}

/// Ordered, case- and space-insensitive map.
///
/// Use the [`InsensitiveMapping`] and [`InsensitiveTupleMapping`] aliases
/// rather than naming the key type directly.
pub struct InsensitiveMap<K: InsensitiveKey, V> {
    store: IndexMap<K::Adjusted, Slot<K, V>, FxBuildHasher>,
}

/// Map keyed by single names (dimension names, element names, ...).
pub type InsensitiveMapping<V> = InsensitiveMap<String, V>;

/// Map keyed by tuples of names, typically cellset coordinates.
pub type InsensitiveTupleMapping<V> = InsensitiveMap<Vec<String>, V>;

impl<K: InsensitiveKey, V> InsensitiveMap<K, V> {
    pub fn new() -> Self {
        InsensitiveMap {
            store: IndexMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        InsensitiveMap {
            store: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    /// Inserts `value` under `key`.
    ///
    /// When an entry with the same adjusted key exists, its value and stored
    /// spelling are replaced without moving the entry, and the previous value
    /// is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.store.entry(key.adjusted()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.key = key;
                Some(std::mem::replace(&mut slot.value, value))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot { key, value });
                None
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        self.store.get(&key.adjusted()).map(|slot| &slot.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        self.store.get_mut(&key.adjusted()).map(|slot| &mut slot.value)
    }

    /// Like [`get`](Self::get) but reports a missing key as an error.
    pub fn try_get<Q>(&self, key: &Q) -> Result<&V, InsensitiveError>
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        let adjusted = key.adjusted();
        self.store
            .get(&adjusted)
            .map(|slot| &slot.value)
            .ok_or_else(|| InsensitiveError::KeyNotFound(format!("{:?}", adjusted)))
    }

    /// Returns the stored spelling and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        self.store
            .get(&key.adjusted())
            .map(|slot| (&slot.key, &slot.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        self.store.contains_key(&key.adjusted())
    }

    /// Removes the entry for `key`; remaining entries keep their relative order.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
    {
        self.store.shift_remove(&key.adjusted()).map(|slot| slot.value)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Entries with their original keys, in first-insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.store.values(),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.store
            .values_mut()
            .map(|slot| (&slot.key, &mut slot.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.store.values().map(|slot| &slot.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.store.values().map(|slot| &slot.value)
    }

    /// Normalized keys, for canonical comparison.
    pub fn adjusted_keys(&self) -> impl Iterator<Item = &K::Adjusted> {
        self.store.keys()
    }

    /// Normalized keys paired with their values.
    pub fn adjusted_items(&self) -> impl Iterator<Item = (&K::Adjusted, &V)> {
        self.store.iter().map(|(adjusted, slot)| (adjusted, &slot.value))
    }

    /// First entry in insertion order.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.store.first().map(|(_, slot)| (&slot.key, &slot.value))
    }
}

impl<K: InsensitiveKey, V> Default for InsensitiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: InsensitiveKey + Clone, V: Clone> Clone for InsensitiveMap<K, V> {
    fn clone(&self) -> Self {
        InsensitiveMap {
            store: self.store.clone(),
        }
    }
}

/// Equality ignores casing, spaces and insertion order.
impl<K: InsensitiveKey, V: PartialEq> PartialEq for InsensitiveMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.store.iter().all(|(adjusted, slot)| {
                other
                    .store
                    .get(adjusted)
                    .map_or(false, |theirs| theirs.value == slot.value)
            })
    }
}

impl<K: InsensitiveKey + fmt::Debug, V: fmt::Debug> fmt::Debug for InsensitiveMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, Q> Index<&Q> for InsensitiveMap<K, V>
where
    K: InsensitiveKey,
    Q: InsensitiveKey<Adjusted = K::Adjusted> + ?Sized,
{
    type Output = V;

    /// # Panics
    /// Panics if no entry matches `key`; use [`InsensitiveMap::try_get`] to
    /// handle that case.
    fn index(&self, key: &Q) -> &V {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<K: InsensitiveKey, V> FromIterator<(K, V)> for InsensitiveMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = InsensitiveMap::new();
        map.extend(iter);
        map
    }
}

impl<K: InsensitiveKey, V> Extend<(K, V)> for InsensitiveMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

// ============================================================================
// ITERATION
// ============================================================================

pub struct Iter<'a, K: InsensitiveKey, V> {
    inner: indexmap::map::Values<'a, <K as InsensitiveKey>::Adjusted, Slot<K, V>>,
}

impl<'a, K: InsensitiveKey, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| (&slot.key, &slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: InsensitiveKey, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K: InsensitiveKey, V> IntoIterator for &'a InsensitiveMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct IntoIter<K: InsensitiveKey, V> {
    inner: indexmap::map::IntoValues<K::Adjusted, Slot<K, V>>,
}

impl<K: InsensitiveKey, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| (slot.key, slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: InsensitiveKey, V> IntoIterator for InsensitiveMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.store.into_values(),
        }
    }
}
