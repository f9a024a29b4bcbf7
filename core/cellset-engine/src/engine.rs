//! FILENAME: core/cellset-engine/src/engine.rs
//! Cellset projector - walks the flat cell list once per output shape.
//!
//! Every projection that reports coordinates derives them through
//! `CoordinateResolver`, so all shapes agree on which tuple a given ordinal
//! belongs to.

use indexmap::IndexMap;
use insensitive::{InsensitiveSet, InsensitiveTupleMapping};
use serde::{Deserialize, Serialize};

use crate::definition::{Cell, CellValue, RawCellset};
use crate::error::{CellsetError, Result};
use crate::geometry::{effective_top, header_tree, CellsetGeometry};
use crate::view::{
    ArrayShape, DygraphRow, FlatRow, FlatTable, NestedArrays, NestedArrayOptions, PageCells,
};

/// Cells to visit: all of them, or the first `top`. A `top` of 0 means all.
fn visible_cells(cells: &[Cell], top: Option<usize>) -> &[Cell] {
    match effective_top(top) {
        Some(top) if top < cells.len() => &cells[..top],
        _ => cells,
    }
}

// ============================================================================
// COORDINATE MAPS
// ============================================================================

/// Walks the cells in ordinal order, handing each coordinate and cell to
/// `visit`.
fn walk_coordinates<'c, F>(raw: &'c RawCellset, top: Option<usize>, mut visit: F) -> Result<()>
where
    F: FnMut(Vec<String>, &'c Cell),
{
    let cells = visible_cells(&raw.cells, top);
    if cells.is_empty() {
        return Ok(());
    }

    let geometry = CellsetGeometry::resolve_axes(&raw.axes, top)?;
    let resolver = geometry.coordinate_resolver(&raw.cube_dimensions())?;
    for (ordinal, cell) in cells.iter().enumerate() {
        visit(resolver.coordinates(ordinal)?, cell);
    }
    Ok(())
}

/// Coordinate (element unique names in cube dimension order) to cell value.
///
/// Null values stay `CellValue::Empty`. An empty cell list yields an empty map.
pub fn project_to_coordinate_map(
    raw: &RawCellset,
    top: Option<usize>,
) -> Result<InsensitiveTupleMapping<CellValue>> {
    let mut content = InsensitiveTupleMapping::with_capacity(visible_cells(&raw.cells, top).len());
    walk_coordinates(raw, top, |coordinates, cell| {
        content.insert(coordinates, cell.value.clone());
    })?;
    Ok(content)
}

/// Like [`project_to_coordinate_map`], keeping every selected cell property.
pub fn project_cells(raw: &RawCellset, top: Option<usize>) -> Result<InsensitiveTupleMapping<Cell>> {
    let mut content = InsensitiveTupleMapping::with_capacity(visible_cells(&raw.cells, top).len());
    walk_coordinates(raw, top, |coordinates, cell| {
        content.insert(coordinates, cell.clone());
    })?;
    Ok(content)
}

// ============================================================================
// NESTED ARRAYS
// ============================================================================

/// Null cells count as 0; numbers are rounded through their decimal text.
fn array_value(value: &CellValue, precision: Option<usize>) -> CellValue {
    match value {
        CellValue::Empty => round_value(0.0, precision),
        CellValue::Text(s) if s.is_empty() => round_value(0.0, precision),
        CellValue::Number(n) => round_value(*n, precision),
        CellValue::Text(s) => CellValue::Text(s.clone()),
    }
}

fn round_value(value: f64, precision: Option<usize>) -> CellValue {
    match precision {
        Some(places) => {
            let formatted = format!("{:.*}", places, value);
            CellValue::Number(formatted.parse().unwrap_or(value))
        }
        None => CellValue::Number(value),
    }
}

fn cell_at(cells: &[Cell], address: usize) -> Result<&Cell> {
    cells.get(address).ok_or_else(|| {
        CellsetError::MalformedCellset(format!(
            "cell {} is addressed by the axes but only {} cells were returned",
            address,
            cells.len()
        ))
    })
}

/// Builds `{titles, headers, cells}` with pages keyed by page header name.
///
/// Dygraph pages hold one row per x header: `[x, v(x, y0), v(x, y1), ...]`
/// with cell address `x + card0 * y + card0 * card1 * z`. UI-array pages map
/// each y header to the values across x, reading cells in ordinal order.
pub fn project_to_nested_arrays(raw: &RawCellset, options: NestedArrayOptions) -> Result<NestedArrays> {
    let header_map = header_tree(raw, options.dimensionality, options.top)?;
    let x_count = header_map.axis_cardinality(0);
    let y_count = header_map.axis_cardinality(1);
    let z_count = header_map.axis_cardinality(2);
    let y_name = |y: usize| header_map.name(1, y).unwrap_or("Row").to_string();
    let z_name = |z: usize| header_map.name(2, z).unwrap_or("Page").to_string();
    let cells = &raw.cells;

    let page_cells = match options.shape {
        ArrayShape::Dygraph => {
            let mut pages = IndexMap::with_capacity(z_count);
            for z in 0..z_count {
                let mut page = Vec::with_capacity(x_count);
                for x in 0..x_count {
                    let mut values = Vec::with_capacity(y_count);
                    for y in 0..y_count {
                        let address = x + x_count * y + x_count * y_count * z;
                        values.push(array_value(&cell_at(cells, address)?.value, options.precision));
                    }
                    page.push(DygraphRow {
                        label: header_map.name(0, x).unwrap_or("Column").to_string(),
                        values,
                    });
                }
                pages.insert(z_name(z), page);
            }
            PageCells::Dygraph(pages)
        }
        ArrayShape::UiArray => {
            let mut pages = IndexMap::with_capacity(z_count);
            let mut ordinal = 0;
            for z in 0..z_count {
                let mut page = IndexMap::with_capacity(y_count);
                for y in 0..y_count {
                    let mut row = Vec::with_capacity(x_count);
                    for _ in 0..x_count {
                        row.push(array_value(&cell_at(cells, ordinal)?.value, options.precision));
                        ordinal += 1;
                    }
                    page.insert(y_name(y), row);
                }
                pages.insert(z_name(z), page);
            }
            PageCells::UiArray(pages)
        }
    };

    Ok(NestedArrays {
        titles: header_map.titles.clone(),
        headers: header_map.headers.clone(),
        cells: page_cells,
    })
}

// ============================================================================
// FAST PATHS
// ============================================================================

/// Cell values in ordinal order, consuming the fetched payload.
#[derive(Debug)]
pub struct ValueStream {
    cells: std::vec::IntoIter<Cell>,
}

impl Iterator for ValueStream {
    type Item = CellValue;

    fn next(&mut self) -> Option<CellValue> {
        self.cells.next().map(|cell| cell.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cells.size_hint()
    }
}

impl ExactSizeIterator for ValueStream {}

pub fn project_to_value_stream(raw: RawCellset) -> ValueStream {
    ValueStream {
        cells: raw.cells.into_iter(),
    }
}

/// Parses the body of a `Cells/$count` response.
pub fn parse_cell_count(body: &str) -> Result<usize> {
    let trimmed = body.trim().trim_start_matches('\u{feff}');
    trimmed.parse().map_err(|_| {
        CellsetError::MalformedCellset(format!("cell count is not an integer: {:?}", trimmed))
    })
}

// ============================================================================
// ROWS AND VALUES
// ============================================================================

/// Row tuple (element names or unique names) to the values of that row.
///
/// Expects a payload with only the row axis expanded, so `Axes[0]` holds the
/// rows and the cells are split evenly among them. No rows yields an empty map.
pub fn project_rows_and_values(
    raw: &RawCellset,
    element_unique_names: bool,
) -> Result<InsensitiveTupleMapping<Vec<CellValue>>> {
    let mut result = InsensitiveTupleMapping::new();
    let rows = match raw.axes.first() {
        Some(axis) if !axis.tuples.is_empty() => &axis.tuples,
        _ => return Ok(result),
    };

    let number_rows = rows.len();
    let number_cells = raw.cells.len();
    if number_cells % number_rows != 0 {
        return Err(CellsetError::MalformedCellset(format!(
            "{} cells cannot be split across {} rows",
            number_cells, number_rows
        )));
    }
    let number_columns = number_cells / number_rows;

    for (index, tuple) in rows.iter().enumerate() {
        let element_tuple = tuple
            .members
            .iter()
            .map(|member| {
                member
                    .element_identifier(element_unique_names)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        CellsetError::MalformedCellset("row member has no element identifier".to_string())
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let start = index * number_columns;
        let values = raw.cells[start..start + number_columns]
            .iter()
            .map(|cell| cell.value.clone())
            .collect();
        result.insert(element_tuple, values);
    }
    Ok(result)
}

/// Axis 1 tuples as rows, axis 0 tuples as columns, in one flat table.
///
/// Expects a payload with member and hierarchy names expanded on axes 0 and 1.
/// Column headers join the member names of each axis-0 tuple with `" / "`.
/// No rows yields headers over an empty body.
pub fn project_to_flat_table(raw: &RawCellset) -> Result<FlatTable> {
    let axis_by_ordinal = |ordinal: usize| {
        raw.axes
            .iter()
            .find(|axis| axis.ordinal == Some(ordinal))
            .or_else(|| raw.axes.get(ordinal))
    };
    let columns = axis_by_ordinal(0);
    let rows = axis_by_ordinal(1);

    let mut headers: Vec<String> = rows
        .map(|axis| {
            axis.hierarchies
                .iter()
                .filter_map(|h| h.name.clone().or_else(|| h.unique_name.clone()))
                .collect()
        })
        .unwrap_or_default();
    if let Some(axis) = columns {
        for tuple in &axis.tuples {
            let names = tuple
                .members
                .iter()
                .map(|member| member.display_name())
                .collect::<Result<Vec<_>>>()?;
            headers.push(names.join(" / "));
        }
    }

    let row_tuples = match rows {
        Some(axis) if !axis.tuples.is_empty() => &axis.tuples,
        _ => return Ok(FlatTable { headers, rows: Vec::new() }),
    };
    if raw.cells.len() % row_tuples.len() != 0 {
        return Err(CellsetError::MalformedCellset(format!(
            "{} cells cannot be split across {} rows",
            raw.cells.len(),
            row_tuples.len()
        )));
    }

    let row_width = raw.cells.len() / row_tuples.len();
    let body = row_tuples
        .iter()
        .enumerate()
        .map(|(index, tuple)| {
            let elements = tuple
                .members
                .iter()
                .map(|member| member.display_name().map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            Ok(FlatRow {
                elements,
                values: raw.cells[index * row_width..(index + 1) * row_width]
                    .iter()
                    .map(|cell| cell.value.clone())
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FlatTable { headers, rows: body })
}

/// Collects row element names and string cell values into one set.
pub fn string_set_from_rows_and_values(
    rows_and_values: &InsensitiveTupleMapping<Vec<CellValue>>,
    exclude_empty_cells: bool,
) -> InsensitiveSet {
    let mut result = InsensitiveSet::new();
    for (row_elements, cell_values) in rows_and_values {
        for element in row_elements {
            result.add(element.as_str());
        }
        for value in cell_values {
            if let CellValue::Text(text) = value {
                if !text.is_empty() || !exclude_empty_cells {
                    result.add(text.as_str());
                }
            }
        }
    }
    result
}

// ============================================================================
// COMPOSITION
// ============================================================================

/// Cube and hierarchy unique names on each axis of a cellset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellsetComposition {
    pub cube: String,
    pub titles: Vec<String>,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
}

impl CellsetComposition {
    /// Reads a payload fetched with `Axes($expand=Hierarchies($select=UniqueName))`.
    pub fn from_raw(raw: &RawCellset) -> Result<Self> {
        let cube = raw
            .cube_name()
            .ok_or_else(|| CellsetError::MalformedCellset("cellset has no cube name".to_string()))?
            .to_string();
        let hierarchies = |position: usize| -> Vec<String> {
            raw.axes
                .get(position)
                .map(|axis| {
                    axis.hierarchies
                        .iter()
                        .filter_map(|h| h.unique_name.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(CellsetComposition {
            cube,
            columns: hierarchies(0),
            rows: hierarchies(1),
            titles: hierarchies(2),
        })
    }
}
