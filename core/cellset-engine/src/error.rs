//! FILENAME: core/cellset-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellsetError {
    #[error("Malformed cellset: {0}")]
    MalformedCellset(String),

    #[error("Cannot build table from empty cellset. Make sure the query is not fully zero suppressed.")]
    EmptyCellset,

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CellsetError>;
