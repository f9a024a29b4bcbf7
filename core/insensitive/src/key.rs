//! FILENAME: core/insensitive/src/key.rs
//! PURPOSE: Key normalization shared by every insensitive container.
//! CONTEXT: Object names coming back from the server differ from the names
//! callers type in casing and in embedded spaces ("Travel Expenses" vs
//! "travelexpenses"). Containers hash and compare the adjusted form produced
//! here while keeping the caller's spelling for display.

use std::fmt;
use std::hash::Hash;

/// Lowercases `item` and removes every space character.
///
/// Only the ASCII space is dropped; tabs and other whitespace are kept.
pub fn lower_and_drop_spaces(item: &str) -> String {
    item.replace(' ', "").to_lowercase()
}

/// Compares two names the way the server resolves object names.
pub fn case_and_space_insensitive_equals(item1: &str, item2: &str) -> bool {
    lower_and_drop_spaces(item1) == lower_and_drop_spaces(item2)
}

// ============================================================================
// KEY TRAIT
// ============================================================================

/// A key that can be looked up case- and space-insensitively.
///
/// `Adjusted` is the normalized form stored in the container index. Borrowed
/// and owned spellings of the same key share one `Adjusted` type so lookups
/// do not need to allocate an owned key first (`&str` against `String` keys,
/// `&[&str]` against `Vec<String>` keys).
pub trait InsensitiveKey {
    type Adjusted: Clone + Eq + Hash + fmt::Debug;

    fn adjusted(&self) -> Self::Adjusted;
}

impl InsensitiveKey for str {
    type Adjusted = String;

    fn adjusted(&self) -> String {
        lower_and_drop_spaces(self)
    }
}

impl InsensitiveKey for String {
    type Adjusted = String;

    fn adjusted(&self) -> String {
        lower_and_drop_spaces(self)
    }
}

impl InsensitiveKey for [String] {
    type Adjusted = Vec<String>;

    fn adjusted(&self) -> Vec<String> {
        self.iter().map(|item| lower_and_drop_spaces(item)).collect()
    }
}

impl InsensitiveKey for Vec<String> {
    type Adjusted = Vec<String>;

    fn adjusted(&self) -> Vec<String> {
        self.as_slice().adjusted()
    }
}

impl<'a> InsensitiveKey for [&'a str] {
    type Adjusted = Vec<String>;

    fn adjusted(&self) -> Vec<String> {
        self.iter().map(|item| lower_and_drop_spaces(item)).collect()
    }
}

impl<'a, const N: usize> InsensitiveKey for [&'a str; N] {
    type Adjusted = Vec<String>;

    fn adjusted(&self) -> Vec<String> {
        self.as_slice().adjusted()
    }
}

impl<'a> InsensitiveKey for Vec<&'a str> {
    type Adjusted = Vec<String>;

    fn adjusted(&self) -> Vec<String> {
        self.as_slice().adjusted()
    }
}
