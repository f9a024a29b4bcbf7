//! FILENAME: core/insensitive/src/lib.rs
//! PURPOSE: Case- and space-insensitive containers for OLAP object names.
//! CONTEXT: The server treats "Business Unit" and "businessunit" as the same
//! dimension. Every container here compares keys on their adjusted form
//! (lowercase, spaces removed) while remembering how the caller spelled them.
//!
//! Layers:
//! - `key`: normalization and the `InsensitiveKey` trait
//! - `mapping`: ordered maps keyed by names or name tuples
//! - `set`: ordered set of names

pub mod error;
pub mod key;
pub mod mapping;
pub mod set;

pub use error::InsensitiveError;
pub use key::{case_and_space_insensitive_equals, lower_and_drop_spaces, InsensitiveKey};
pub use mapping::{InsensitiveMap, InsensitiveMapping, InsensitiveTupleMapping};
pub use set::InsensitiveSet;
