//! FILENAME: core/insensitive/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsensitiveError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),
}
