//! FILENAME: core/cellset-engine/src/lib.rs
//! Cellset extraction and coordinate reconciliation.
//!
//! Turns a fetched cellset (axes of member tuples plus a flat, ordinal-ordered
//! cell list) into addressable structures. The crate performs no I/O; the
//! client crate fetches the payload and hands it over.
//!
//! Layers:
//! - `definition`: Raw cellset model as returned by the server
//! - `geometry`: Axis classification, ordinal law and header tree
//! - `engine`: Projections into coordinate maps, nested arrays and streams
//! - `view`: Serializable shapes for grids and charts
//! - `tabular`: Row-oriented tables, CSV and pivoting
//! - `unique_name`: Element unique name helpers

pub mod definition;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod tabular;
pub mod unique_name;
pub mod view;

pub use definition::*;
pub use engine::{
    parse_cell_count, project_cells, project_rows_and_values, project_to_coordinate_map,
    project_to_flat_table, project_to_nested_arrays, project_to_value_stream,
    string_set_from_rows_and_values, CellsetComposition, ValueStream,
};
pub use error::{CellsetError, Result};
pub use geometry::{header_tree, CellsetGeometry, CoordinateResolver};
pub use tabular::{
    from_rows, to_rows, DimensionColumn, PivotOptions, PivotTable, Table, TableOptions, TableRow,
};
pub use unique_name::*;
pub use view::*;
