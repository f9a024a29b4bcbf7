//! FILENAME: core/cellset-engine/src/definition.rs
//! Raw cellset model - the JSON shape returned by the server.
//!
//! A cellset is requested with `$expand` clauses selecting only the member,
//! element and cell properties the caller needs, so nearly every field here is
//! optional. Properties that were selected but have no dedicated field are kept
//! in the flattened `properties` maps in server order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CellsetError, Result};

/// Additional properties of a member, element or cell, in response order.
pub type PropertyMap = IndexMap<String, serde_json::Value>;

// ============================================================================
// CELL VALUES
// ============================================================================

/// The `Value` of a cell: numeric, string, or null when the cell holds no data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses a CSV field: blank is empty, numeric text is a number.
    pub fn parse(field: &str) -> CellValue {
        if field.is_empty() {
            return CellValue::Empty;
        }
        match field.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(field.to_string()),
        }
    }

    /// Text sent in write-back payloads. Empty cells and zero write `""`.
    pub fn to_update_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) if *n == 0.0 => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// CELLSET PARTS
// ============================================================================

/// One entry of the flat `Cells` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cell {
    /// Position in the flat cell list, when `Ordinal` was selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,

    #[serde(default)]
    pub value: CellValue,

    /// Other selected cell properties (RuleDerived, Updateable, ...).
    #[serde(flatten)]
    pub properties: PropertyMap,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Cell {
            value: value.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElementRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,

    #[serde(flatten)]
    pub properties: PropertyMap,
}

/// A member of an axis tuple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,

    #[serde(flatten)]
    pub properties: PropertyMap,
}

impl Member {
    /// Unique name used as a coordinate fragment. The element's unique name
    /// wins over the member's own when both were selected.
    pub fn coordinate(&self) -> Result<&str> {
        self.element
            .as_ref()
            .and_then(|e| e.unique_name.as_deref())
            .or(self.unique_name.as_deref())
            .ok_or_else(|| {
                CellsetError::MalformedCellset(
                    "member has neither Element.UniqueName nor UniqueName".to_string(),
                )
            })
    }

    /// Display name for headers.
    pub fn display_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .or_else(|| self.element.as_ref().and_then(|e| e.name.as_deref()))
            .ok_or_else(|| {
                CellsetError::MalformedCellset("member has no Name property".to_string())
            })
    }

    /// Element name, or element unique name, for row-and-value extractions.
    pub fn element_identifier(&self, unique_name: bool) -> Option<&str> {
        let element = self.element.as_ref();
        if unique_name {
            element
                .and_then(|e| e.unique_name.as_deref())
                .or(self.unique_name.as_deref())
        } else {
            element
                .and_then(|e| e.name.as_deref())
                .or(self.name.as_deref())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AxisTuple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,

    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HierarchyRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
}

/// One axis of a cellset: 0 = columns, 1 = rows, 2 = titles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Axis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,

    /// Number of tuples the server placed on this axis.
    #[serde(default)]
    pub cardinality: usize,

    #[serde(default)]
    pub tuples: Vec<AxisTuple>,

    /// Present only when `Hierarchies` was expanded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchies: Vec<HierarchyRef>,
}

impl Axis {
    /// An axis without tuples contributes no coordinates.
    pub fn is_degenerate(&self) -> bool {
        self.tuples.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DimensionRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CubeRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub dimensions: Vec<DimensionRef>,
}

// ============================================================================
// RAW CELLSET
// ============================================================================

/// A fetched cellset: axes of member tuples plus the flat cell list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCellset {
    #[serde(default, rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cube: Option<CubeRef>,

    #[serde(default)]
    pub axes: Vec<Axis>,

    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl RawCellset {
    pub fn from_json(body: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Dimension names in the cube's own order.
    pub fn cube_dimensions(&self) -> Vec<String> {
        self.cube
            .as_ref()
            .map(|cube| cube.dimensions.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn cube_name(&self) -> Option<&str> {
        self.cube.as_ref().and_then(|cube| cube.name.as_deref())
    }
}
