//! FILENAME: core/cellset-engine/src/tabular.rs
//! Tabular conversion - coordinate maps <-> flat rows.
//!
//! A `Table` has one column per coordinate fragment plus a value column. Rows
//! carry plain element names; the dimension and hierarchy of each column are
//! kept on the column so unique names can be rebuilt on the way back.

use indexmap::{IndexMap, IndexSet};
use insensitive::{case_and_space_insensitive_equals, InsensitiveTupleMapping};
use serde::{Deserialize, Serialize};

use crate::definition::CellValue;
use crate::error::{CellsetError, Result};
use crate::unique_name::{
    dimension_name_from_element_unique_name, element_name_from_element_unique_name,
    hierarchy_name_from_element_unique_name,
};

/// Name of the value column for tables built from coordinate maps.
pub const VALUE_COLUMN: &str = "Values";

// ============================================================================
// TABLE
// ============================================================================

/// A dimension column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionColumn {
    pub dimension: String,

    /// Explicit hierarchy, when the source used `[dim].[hier].[elem]`.
    pub hierarchy: Option<String>,
}

impl DimensionColumn {
    pub fn new(dimension: impl Into<String>) -> Self {
        DimensionColumn {
            dimension: dimension.into(),
            hierarchy: None,
        }
    }

    fn from_fragment(fragment: &str) -> Self {
        let hierarchy = if fragment.matches("].[").count() >= 2 {
            Some(hierarchy_name_from_element_unique_name(fragment).to_string())
        } else {
            None
        };
        DimensionColumn {
            dimension: dimension_name_from_element_unique_name(fragment).to_string(),
            hierarchy,
        }
    }

    fn unique_name(&self, element: &str) -> String {
        match &self.hierarchy {
            Some(hierarchy) => format!("[{}].[{}].[{}]", self.dimension, hierarchy, element),
            None => format!("[{}].[{}]", self.dimension, element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Element names, one per dimension column.
    pub elements: Vec<String>,
    pub value: CellValue,
}

/// How [`to_rows`] lays out the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Treat dimension columns as ordinary columns rather than a row index.
    pub split_multi_index: bool,

    /// Sort rows by their element names. Only applies with `split_multi_index`.
    pub sort: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            split_multi_index: true,
            sort: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<DimensionColumn>,
    pub value_column: String,
    pub rows: Vec<TableRow>,

    /// Dimension columns form the row index (rows keep cellset order).
    pub multi_index: bool,
}

/// Flattens a coordinate map into rows of element names plus value.
///
/// Column names come from the first coordinate. Fails with
/// `CellsetError::EmptyCellset` for an empty map, which callers use to tell a
/// fully zero-suppressed result apart from an empty table.
pub fn to_rows(cellset: &InsensitiveTupleMapping<CellValue>, options: TableOptions) -> Result<Table> {
    let (first, _) = cellset.first().ok_or(CellsetError::EmptyCellset)?;
    let columns: Vec<DimensionColumn> = first.iter().map(|f| DimensionColumn::from_fragment(f)).collect();

    let mut rows = Vec::with_capacity(cellset.len());
    for (coordinates, value) in cellset {
        if coordinates.len() != columns.len() {
            return Err(CellsetError::MalformedCellset(format!(
                "coordinate {:?} has {} fragments, expected {}",
                coordinates,
                coordinates.len(),
                columns.len()
            )));
        }
        rows.push(TableRow {
            elements: coordinates
                .iter()
                .map(|fragment| element_name_from_element_unique_name(fragment).to_string())
                .collect(),
            value: value.clone(),
        });
    }

    if options.split_multi_index && options.sort {
        rows.sort_by(|a, b| a.elements.cmp(&b.elements));
    }

    Ok(Table {
        columns,
        value_column: VALUE_COLUMN.to_string(),
        rows,
        multi_index: !options.split_multi_index,
    })
}

/// Rebuilds a coordinate map from table rows, in row order.
pub fn from_rows(table: &Table) -> InsensitiveTupleMapping<CellValue> {
    let mut cellset = InsensitiveTupleMapping::with_capacity(table.rows.len());
    for row in &table.rows {
        let coordinates = table
            .columns
            .iter()
            .zip(&row.elements)
            .map(|(column, element)| column.unique_name(element))
            .collect();
        cellset.insert(coordinates, row.value.clone());
    }
    cellset
}

impl Table {
    pub fn from_coordinate_map(
        cellset: &InsensitiveTupleMapping<CellValue>,
        options: TableOptions,
    ) -> Result<Self> {
        to_rows(cellset, options)
    }

    pub fn to_coordinate_map(&self) -> InsensitiveTupleMapping<CellValue> {
        from_rows(self)
    }

    /// Element-name tuples to values, the shape accepted by cube writes.
    pub fn to_element_map(&self) -> InsensitiveTupleMapping<CellValue> {
        self.rows
            .iter()
            .map(|row| (row.elements.clone(), row.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.dimension.as_str())
            .chain(std::iter::once(self.value_column.as_str()))
            .collect()
    }

    fn column_index(&self, dimension: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| case_and_space_insensitive_equals(&c.dimension, dimension))
            .ok_or_else(|| CellsetError::Configuration(format!("table has no column {}", dimension)))
    }

    // ========================================================================
    // CSV
    // ========================================================================

    /// Reads server `Content` CSV: a header row naming the dimensions and the
    /// value column, then one line per cell.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let header = reader.headers()?.clone();
        let Some(value_column) = header.iter().last() else {
            return Err(CellsetError::EmptyCellset);
        };
        let columns: Vec<DimensionColumn> = header
            .iter()
            .take(header.len() - 1)
            .map(DimensionColumn::new)
            .collect();
        let value_column = value_column.to_string();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields: Vec<&str> = record.iter().collect();
            let value = fields.pop().map(CellValue::parse).unwrap_or_default();
            rows.push(TableRow {
                elements: fields.into_iter().map(str::to_string).collect(),
                value,
            });
        }

        log::debug!(target: "CELLSET", "read {} rows from csv content", rows.len());
        Ok(Table {
            columns,
            value_column,
            rows,
            multi_index: false,
        })
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.column_names())?;
        for row in &self.rows {
            let value = row.value.to_string();
            writer.write_record(row.elements.iter().map(String::as_str).chain(std::iter::once(value.as_str())))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CellsetError::Csv(e.into_error().into()))?;
        String::from_utf8(bytes)
            .map_err(|e| CellsetError::MalformedCellset(format!("csv output is not UTF-8: {}", e)))
    }

    // ========================================================================
    // PIVOT
    // ========================================================================

    /// Cross-tabulates the table, summing numeric values per row/column key.
    ///
    /// Dimensions not named in `row_dimensions` or `column_dimensions` are
    /// aggregated away. Row and column keys are sorted.
    pub fn pivot<S: AsRef<str>>(
        &self,
        row_dimensions: &[S],
        column_dimensions: &[S],
        options: PivotOptions,
    ) -> Result<PivotTable> {
        let row_indices = row_dimensions
            .iter()
            .map(|d| self.column_index(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let column_indices = column_dimensions
            .iter()
            .map(|d| self.column_index(d.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let key_of = |row: &TableRow, indices: &[usize]| -> Vec<String> {
            indices.iter().map(|i| row.elements[*i].clone()).collect()
        };

        let mut row_keys: IndexSet<Vec<String>> = IndexSet::new();
        let mut column_keys: IndexSet<Vec<String>> = IndexSet::new();
        let mut sums: IndexMap<(usize, usize), Option<f64>> = IndexMap::new();
        for row in &self.rows {
            let (r, _) = row_keys.insert_full(key_of(row, &row_indices));
            let (c, _) = column_keys.insert_full(key_of(row, &column_indices));
            let slot = sums.entry((r, c)).or_insert(None);
            if let Some(number) = row.value.as_f64() {
                *slot = Some(slot.unwrap_or(0.0) + number);
            }
        }

        let (mut row_keys, row_order) = sorted_keys(row_keys);
        let (mut column_keys, column_order) = sorted_keys(column_keys);
        let mut values = vec![vec![None; column_keys.len()]; row_keys.len()];
        for ((r, c), sum) in sums {
            values[row_order[r]][column_order[c]] = sum;
        }

        if options.drop_empty {
            let keep_columns: Vec<bool> = (0..column_keys.len())
                .map(|c| values.iter().any(|row| row[c].is_some()))
                .collect();
            let keep_rows: Vec<bool> = values.iter().map(|row| row.iter().any(Option::is_some)).collect();

            row_keys = retain_flagged(row_keys, &keep_rows);
            values = retain_flagged(values, &keep_rows);
            column_keys = retain_flagged(column_keys, &keep_columns);
            for row in values.iter_mut() {
                *row = retain_flagged(std::mem::take(row), &keep_columns);
            }
        }

        if let Some(fill) = options.fill_value {
            for cell in values.iter_mut().flatten() {
                cell.get_or_insert(fill);
            }
        }

        Ok(PivotTable {
            row_dimensions: row_indices.iter().map(|i| self.columns[*i].dimension.clone()).collect(),
            column_dimensions: column_indices.iter().map(|i| self.columns[*i].dimension.clone()).collect(),
            row_keys,
            column_keys,
            values,
        })
    }
}

/// Sorts keys collected in encounter order. The second vector maps each
/// encounter index to its sorted position.
fn sorted_keys(keys: IndexSet<Vec<String>>) -> (Vec<Vec<String>>, Vec<usize>) {
    let mut ranked: Vec<(usize, Vec<String>)> = keys.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| a.1.cmp(&b.1));

    let mut position = vec![0; ranked.len()];
    let mut sorted = Vec::with_capacity(ranked.len());
    for (new_index, (old_index, key)) in ranked.into_iter().enumerate() {
        position[old_index] = new_index;
        sorted.push(key);
    }
    (sorted, position)
}

fn retain_flagged<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

// ============================================================================
// PIVOT TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PivotOptions {
    /// Drop rows and columns without any numeric value.
    pub drop_empty: bool,

    /// Value for combinations without data.
    pub fill_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub row_dimensions: Vec<String>,
    pub column_dimensions: Vec<String>,
    pub row_keys: Vec<Vec<String>>,
    pub column_keys: Vec<Vec<String>>,

    /// `values[row][column]`, `None` where no numeric value was found.
    pub values: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn get<S: AsRef<str>>(&self, row_key: &[S], column_key: &[S]) -> Option<f64> {
        let matches = |key: &Vec<String>, wanted: &[S]| {
            key.len() == wanted.len()
                && key
                    .iter()
                    .zip(wanted)
                    .all(|(a, b)| case_and_space_insensitive_equals(a, b.as_ref()))
        };
        let row = self.row_keys.iter().position(|k| matches(k, row_key))?;
        let column = self.column_keys.iter().position(|k| matches(k, column_key))?;
        self.values[row][column]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    fn sample_map() -> InsensitiveTupleMapping<CellValue> {
        let mut map = InsensitiveTupleMapping::new();
        map.insert(key(&["[Region].[Region].[South]", "[Year].[Year].[2024]"]), CellValue::from(3.0));
        map.insert(key(&["[Region].[Region].[North]", "[Year].[Year].[2024]"]), CellValue::from(1.0));
        map.insert(key(&["[Region].[Region].[North]", "[Year].[Year].[2025]"]), CellValue::Empty);
        map.insert(key(&["[Region].[Region].[South]", "[Year].[Year].[2025]"]), CellValue::from("n/a"));
        map
    }

    #[test]
    fn test_to_rows_infers_columns_and_sorts() {
        let table = to_rows(&sample_map(), TableOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["Region", "Year", "Values"]);
        assert_eq!(table.columns[0].hierarchy.as_deref(), Some("Region"));
        assert_eq!(table.rows[0].elements, key(&["North", "2024"]));
        assert_eq!(table.rows[3].elements, key(&["South", "2025"]));
        assert!(!table.multi_index);
    }

    #[test]
    fn test_to_rows_multi_index_keeps_order() {
        let options = TableOptions {
            split_multi_index: false,
            sort: true,
        };
        let table = to_rows(&sample_map(), options).unwrap();
        assert!(table.multi_index);
        assert_eq!(table.rows[0].elements, key(&["South", "2024"]));
    }

    #[test]
    fn test_to_rows_empty_fails() {
        let empty = InsensitiveTupleMapping::new();
        let err = to_rows(&empty, TableOptions::default()).unwrap_err();
        assert!(matches!(err, CellsetError::EmptyCellset));
        assert!(err.to_string().to_lowercase().contains("cannot build table from empty cellset"));
    }

    #[test]
    fn test_round_trip_one_to_three_columns() {
        let mut one = InsensitiveTupleMapping::new();
        one.insert(key(&["[A].[x]"]), CellValue::from(1.0));
        one.insert(key(&["[A].[y]"]), CellValue::Empty);

        let mut two = InsensitiveTupleMapping::new();
        two.insert(key(&["[A].[A].[x]", "[B].[Alt].[p]"]), CellValue::from("t"));

        let mut three = InsensitiveTupleMapping::new();
        three.insert(key(&["[A].[x]", "[B].[p]", "[C].[q]"]), CellValue::from(2.5));
        three.insert(key(&["[A].[y]", "[B].[p]", "[C].[r]"]), CellValue::from(-1.0));

        for map in [one, two, three] {
            let table = to_rows(&map, TableOptions::default()).unwrap();
            assert_eq!(from_rows(&table), map);
        }
    }

    #[test]
    fn test_element_map() {
        let table = to_rows(&sample_map(), TableOptions::default()).unwrap();
        let elements = table.to_element_map();
        assert_eq!(elements[&["north", "2024"]], CellValue::Number(1.0));
    }

    #[test]
    fn test_csv_round_trip() {
        let text = "Region,Year,Value\nNorth,2024,1.5\nSouth,2024,\nSouth,2025,n/a\n";
        let table = Table::from_csv(text).unwrap();
        assert_eq!(table.column_names(), vec!["Region", "Year", "Value"]);
        assert_eq!(table.rows[0].value, CellValue::Number(1.5));
        assert_eq!(table.rows[1].value, CellValue::Empty);
        assert_eq!(table.rows[2].value, CellValue::from("n/a"));

        assert_eq!(table.to_csv().unwrap(), text);

        let map = table.to_coordinate_map();
        assert!(map.contains_key(&["[Region].[North]", "[Year].[2024]"]));
    }

    #[test]
    fn test_csv_without_header_is_empty() {
        assert!(matches!(Table::from_csv(""), Err(CellsetError::EmptyCellset)));
    }

    #[test]
    fn test_pivot_sums_and_fills() {
        let mut map = sample_map();
        map.insert(key(&["[Region].[Region].[North]", "[Year].[Year].[2026]"]), CellValue::from(4.0));
        let table = to_rows(&map, TableOptions::default()).unwrap();

        let pivot = table.pivot(&["Region"], &["Year"], PivotOptions::default()).unwrap();
        assert_eq!(pivot.row_keys, vec![key(&["North"]), key(&["South"])]);
        assert_eq!(pivot.column_keys, vec![key(&["2024"]), key(&["2025"]), key(&["2026"])]);
        assert_eq!(pivot.get(&["north"], &["2024"]), Some(1.0));
        assert_eq!(pivot.get(&["South"], &["2025"]), None);

        let filled = table
            .pivot(&["Region"], &["Year"], PivotOptions { drop_empty: false, fill_value: Some(0.0) })
            .unwrap();
        assert_eq!(filled.get(&["South"], &["2026"]), Some(0.0));

        let dropped = table
            .pivot(&["Region"], &["Year"], PivotOptions { drop_empty: true, fill_value: None })
            .unwrap();
        assert_eq!(dropped.column_keys, vec![key(&["2024"]), key(&["2026"])]);
    }

    #[test]
    fn test_pivot_aggregates_unused_dimensions() {
        let table = to_rows(&sample_map(), TableOptions::default()).unwrap();
        let empty: [&str; 0] = [];
        let pivot = table.pivot(&["Year"], &empty, PivotOptions::default()).unwrap();
        assert_eq!(pivot.get(&["2024"], &empty), Some(4.0));
    }

    #[test]
    fn test_pivot_places_unsorted_repeated_keys() {
        let row = |region: &str, year: &str, value: f64| TableRow {
            elements: key(&[region, year]),
            value: CellValue::from(value),
        };
        let table = Table {
            columns: vec![DimensionColumn::new("Region"), DimensionColumn::new("Year")],
            value_column: "Values".to_string(),
            rows: vec![
                row("West", "2025", 1.0),
                row("East", "2024", 2.0),
                row("West", "2024", 3.0),
                row("West", "2025", 10.0),
                row("East", "2025", 5.0),
            ],
            multi_index: true,
        };

        let pivot = table.pivot(&["Region"], &["Year"], PivotOptions::default()).unwrap();
        assert_eq!(pivot.row_keys, vec![key(&["East"]), key(&["West"])]);
        assert_eq!(pivot.column_keys, vec![key(&["2024"]), key(&["2025"])]);
        assert_eq!(pivot.values, vec![vec![Some(2.0), Some(5.0)], vec![Some(3.0), Some(11.0)]]);
    }

    #[test]
    fn test_pivot_unknown_dimension() {
        let table = to_rows(&sample_map(), TableOptions::default()).unwrap();
        let err = table.pivot(&["Nope"], &["Year"], PivotOptions::default()).unwrap_err();
        assert!(matches!(err, CellsetError::Configuration(_)));
    }
}
