//! FILENAME: core/insensitive/src/set.rs
//! PURPOSE: Ordered set of names compared case- and space-insensitively.
//! CONTEXT: Used for user group lists and for the string values collected from
//! row-and-value extractions, where "North America" and "northamerica" are the
//! same member.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::key::lower_and_drop_spaces;

pub struct InsensitiveSet {
    store: IndexMap<String, String, FxBuildHasher>,
}

impl InsensitiveSet {
    pub fn new() -> Self {
        InsensitiveSet {
            store: IndexMap::default(),
        }
    }

    /// Adds `value`, overwriting the stored spelling of an equal entry.
    /// Returns `true` if no equal entry was present.
    pub fn add(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        self.store
            .insert(lower_and_drop_spaces(&value), value)
            .is_none()
    }

    /// Removes `value` if present. Absent values are ignored.
    pub fn discard(&mut self, value: &str) {
        self.store.shift_remove(&lower_and_drop_spaces(value));
    }

    /// Removes `value`, reporting whether it was present.
    pub fn remove(&mut self, value: &str) -> bool {
        self.store
            .shift_remove(&lower_and_drop_spaces(value))
            .is_some()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.store.contains_key(&lower_and_drop_spaces(value))
    }

    /// Stored spelling of the entry equal to `value`.
    pub fn get(&self, value: &str) -> Option<&str> {
        self.store
            .get(&lower_and_drop_spaces(value))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Stored spellings in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.store.values().map(String::as_str)
    }

    pub fn adjusted_values(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    pub fn is_subset(&self, other: &InsensitiveSet) -> bool {
        self.store.keys().all(|k| other.store.contains_key(k))
    }
}

impl Default for InsensitiveSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InsensitiveSet {
    fn clone(&self) -> Self {
        InsensitiveSet {
            store: self.store.clone(),
        }
    }
}

impl PartialEq for InsensitiveSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl Eq for InsensitiveSet {}

impl fmt::Debug for InsensitiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for InsensitiveSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = InsensitiveSet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for InsensitiveSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl IntoIterator for InsensitiveSet {
    type Item = String;
    type IntoIter = indexmap::map::IntoValues<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.store.into_values()
    }
}
