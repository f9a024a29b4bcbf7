//! FILENAME: core/cellset-engine/src/view.rs
//! Cellset views - shapes handed to grids and charting front ends.
//!
//! Both nested-array shapes address cells with the same three-level layout:
//! axis 0 is x, axis 1 is y and axis 2 (or a synthesized placeholder) is the
//! page z. Missing values are reported as 0 in these shapes.

use indexmap::IndexMap;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::definition::{CellValue, Member};

// ============================================================================
// HEADERS
// ============================================================================

/// One tuple of an axis rendered as a header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    /// Member names of the tuple joined with " / ".
    pub name: String,

    /// The tuple's members. Empty for synthesized placeholders.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
}

impl Header {
    pub fn placeholder(name: &str) -> Self {
        Header {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.members.is_empty()
    }
}

/// Headers of every axis, with a single-tuple last axis split out as titles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderMap {
    pub titles: Vec<Header>,
    pub headers: Vec<Vec<Header>>,
    pub dimensionality: usize,
    pub cardinality: Vec<usize>,
}

impl HeaderMap {
    /// Header name at `index` on `axis`, if that axis exists.
    pub fn name(&self, axis: usize, index: usize) -> Option<&str> {
        self.headers
            .get(axis)
            .and_then(|headers| headers.get(index))
            .map(|header| header.name.as_str())
    }

    /// Cardinality of `axis`; absent axes count as 1.
    pub fn axis_cardinality(&self, axis: usize) -> usize {
        self.cardinality.get(axis).copied().unwrap_or(1)
    }
}

// ============================================================================
// NESTED ARRAYS
// ============================================================================

/// Which nested-array layout to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayShape {
    /// Per page, one row per x header holding the values across y.
    #[default]
    Dygraph,
    /// Per page, one entry per y header holding the values across x.
    UiArray,
}

/// Options for nested-array projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestedArrayOptions {
    pub shape: ArrayShape,

    /// Minimum number of header axes (1, 2 or 3) reported in `headers`.
    pub dimensionality: usize,

    /// Decimal places for numeric values. `None` leaves values unrounded.
    pub precision: Option<usize>,

    /// `$top` the tuples were fetched with. Axes cut short by it are not malformed.
    pub top: Option<usize>,
}

impl Default for NestedArrayOptions {
    fn default() -> Self {
        NestedArrayOptions {
            shape: ArrayShape::Dygraph,
            dimensionality: 3,
            precision: None,
            top: None,
        }
    }
}

impl NestedArrayOptions {
    pub fn dygraph(precision: Option<usize>) -> Self {
        NestedArrayOptions {
            shape: ArrayShape::Dygraph,
            precision,
            ..Default::default()
        }
    }

    pub fn ui_array(precision: Option<usize>) -> Self {
        NestedArrayOptions {
            shape: ArrayShape::UiArray,
            precision,
            ..Default::default()
        }
    }
}

/// `[x header, value, value, ...]`, serialized as one flat array.
#[derive(Debug, Clone, PartialEq)]
pub struct DygraphRow {
    pub label: String,
    pub values: Vec<CellValue>,
}

impl Serialize for DygraphRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.label)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// Cells keyed by page header name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageCells {
    Dygraph(IndexMap<String, Vec<DygraphRow>>),
    UiArray(IndexMap<String, IndexMap<String, Vec<CellValue>>>),
}

impl PageCells {
    pub fn len(&self) -> usize {
        match self {
            PageCells::Dygraph(pages) => pages.len(),
            PageCells::UiArray(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `{titles, headers, cells}` for grids and charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedArrays {
    pub titles: Vec<Header>,
    pub headers: Vec<Vec<Header>>,
    pub cells: PageCells,
}

impl NestedArrays {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// One row of a [`FlatTable`]: row element names followed by that row's values.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub elements: Vec<String>,
    pub values: Vec<CellValue>,
}

impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.elements.len() + self.values.len()))?;
        for element in &self.elements {
            seq.serialize_element(element)?;
        }
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// Header row plus body rows, for BI tools that load a plain table.
///
/// Headers are the row hierarchy names followed by one name per column tuple.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
