//! FILENAME: core/cellset-engine/src/geometry.rs
//! Cellset geometry - axis classification, validation and headers.
//!
//! PURPOSE: Turn the axes of a raw cellset into the information the projector
//! needs: which axes are present, their cardinalities, the coordinate fragments
//! of every tuple, and the header tree used by the nested-array views.
//!
//! Naming follows the server's axis order rather than the visual role:
//! `row_axis` is axis 0 and `column_axis` is axis 1. Axis 0 varies fastest in
//! the flat cell list.

use crate::definition::{Axis, AxisTuple, RawCellset};
use crate::error::{CellsetError, Result};
use crate::unique_name::{dimension_ranks, fragment_rank, order_by_rank};
use crate::view::{Header, HeaderMap};

const ROW_PLACEHOLDER: &str = "Row";
const PAGE_PLACEHOLDER: &str = "Page";
const COLUMN_PLACEHOLDER: &str = "Column";

// ============================================================================
// AXIS CLASSIFICATION
// ============================================================================

/// Present (non-degenerate) axes of a cellset, by position.
#[derive(Debug, Clone, Copy)]
pub struct CellsetGeometry<'a> {
    /// Axis 0.
    pub row_axis: Option<&'a Axis>,
    /// Axis 1.
    pub column_axis: Option<&'a Axis>,
    /// Axis 2, the title/context axis. Only its first tuple is used.
    pub title_axis: Option<&'a Axis>,
}

impl<'a> CellsetGeometry<'a> {
    /// Classifies `axes` by position and validates each present axis.
    ///
    /// An axis without tuples is treated as absent. A present axis must carry
    /// exactly `Cardinality` tuples, or `min(Cardinality, top)` when the tuples
    /// were requested with `$top`. A `top` of 0 means no limit.
    pub fn resolve_axes(axes: &'a [Axis], top: Option<usize>) -> Result<Self> {
        let top = effective_top(top);
        if axes.len() > 3 {
            return Err(CellsetError::MalformedCellset(format!(
                "expected at most 3 axes, found {}",
                axes.len()
            )));
        }

        let mut present: [Option<&'a Axis>; 3] = [None; 3];
        for (position, axis) in axes.iter().enumerate() {
            if axis.is_degenerate() {
                continue;
            }
            validate_axis(position, axis, top)?;
            present[position] = Some(axis);
        }

        let geometry = CellsetGeometry {
            row_axis: present[0],
            column_axis: present[1],
            title_axis: present[2],
        };
        log::debug!(
            target: "CELLSET",
            "resolved axes: row={} column={} titles={}",
            geometry.row_cardinality(),
            geometry.column_cardinality(),
            geometry.title_axis.is_some()
        );
        Ok(geometry)
    }

    /// Cardinality of axis 0, or 1 when absent.
    pub fn row_cardinality(&self) -> usize {
        divisor(self.row_axis)
    }

    /// Cardinality of axis 1, or 1 when absent.
    pub fn column_cardinality(&self) -> usize {
        divisor(self.column_axis)
    }

    /// Number of cells the axes describe.
    pub fn cell_count(&self) -> usize {
        if self.row_axis.is_none() && self.column_axis.is_none() && self.title_axis.is_none() {
            return 0;
        }
        self.row_cardinality() * self.column_cardinality()
    }

    /// Precomputes the coordinate fragments of every tuple, ranked against
    /// `cube_dimensions`.
    pub fn coordinate_resolver<S: AsRef<str>>(&self, cube_dimensions: &[S]) -> Result<CoordinateResolver> {
        let ranks = dimension_ranks(cube_dimensions);
        let resolve = |axis: &Axis| -> Result<ResolvedAxis> {
            let tuples = axis
                .tuples
                .iter()
                .map(|tuple| ranked_fragments(tuple, &ranks))
                .collect::<Result<Vec<_>>>()?;
            Ok(ResolvedAxis {
                cardinality: axis.cardinality.max(1),
                tuples,
            })
        };

        let row_axis = self.row_axis.map(resolve).transpose()?;
        let column_axis = self.column_axis.map(resolve).transpose()?;
        let titles = match self.title_axis.and_then(|axis| axis.tuples.first()) {
            Some(tuple) => ranked_fragments(tuple, &ranks)?,
            None => Vec::new(),
        };

        Ok(CoordinateResolver {
            row_axis,
            column_axis,
            titles,
        })
    }
}

/// `$top` as the server applies it: 0 is the same as no limit.
pub(crate) fn effective_top(top: Option<usize>) -> Option<usize> {
    top.filter(|top| *top > 0)
}

fn divisor(axis: Option<&Axis>) -> usize {
    axis.map(|a| a.cardinality).filter(|c| *c > 0).unwrap_or(1)
}

fn validate_axis(position: usize, axis: &Axis, top: Option<usize>) -> Result<()> {
    let expected = match top {
        Some(top) => axis.cardinality.min(top),
        None => axis.cardinality,
    };
    if axis.tuples.len() != expected {
        return Err(CellsetError::MalformedCellset(format!(
            "axis {} declares cardinality {} but carries {} tuples",
            position,
            axis.cardinality,
            axis.tuples.len()
        )));
    }
    Ok(())
}

fn ranked_fragments(
    tuple: &AxisTuple,
    ranks: &insensitive::InsensitiveMapping<usize>,
) -> Result<Vec<(usize, String)>> {
    tuple
        .members
        .iter()
        .map(|member| {
            let fragment = member.coordinate()?;
            Ok((fragment_rank(ranks, fragment), fragment.to_string()))
        })
        .collect()
}

// ============================================================================
// ORDINAL LAW
// ============================================================================

#[derive(Debug, Clone)]
struct ResolvedAxis {
    cardinality: usize,
    tuples: Vec<Vec<(usize, String)>>,
}

/// Maps cell ordinals to coordinates in cube dimension order.
#[derive(Debug, Clone)]
pub struct CoordinateResolver {
    row_axis: Option<ResolvedAxis>,
    column_axis: Option<ResolvedAxis>,
    titles: Vec<(usize, String)>,
}

impl CoordinateResolver {
    /// Tuple indices `(index_rows, index_columns)` for `ordinal`.
    ///
    /// `index_rows` selects the column_axis (axis 1) tuple and `index_columns`
    /// the row_axis (axis 0) tuple.
    pub fn tuple_indices(&self, ordinal: usize) -> (usize, usize) {
        let row_cardinality = self.row_axis.as_ref().map_or(1, |a| a.cardinality);
        let column_cardinality = self.column_axis.as_ref().map_or(1, |a| a.cardinality);
        let index_rows = (ordinal / row_cardinality) % column_cardinality;
        let index_columns = ordinal % row_cardinality;
        (index_rows, index_columns)
    }

    /// Coordinate of the cell at `ordinal`.
    pub fn coordinates(&self, ordinal: usize) -> Result<Vec<String>> {
        let (index_rows, index_columns) = self.tuple_indices(ordinal);
        let mut ranked: Vec<&(usize, String)> = Vec::new();

        if let Some(column_axis) = &self.column_axis {
            ranked.extend(tuple_at(column_axis, index_rows, 1)?);
        }
        ranked.extend(self.titles.iter());
        if let Some(row_axis) = &self.row_axis {
            ranked.extend(tuple_at(row_axis, index_columns, 0)?);
        }

        order_by_rank(&mut ranked);
        Ok(ranked.into_iter().map(|(_, fragment)| fragment.clone()).collect())
    }
}

fn tuple_at(axis: &ResolvedAxis, index: usize, position: usize) -> Result<&Vec<(usize, String)>> {
    axis.tuples.get(index).ok_or_else(|| {
        CellsetError::MalformedCellset(format!(
            "tuple {} requested on axis {} which carries {} tuples",
            index,
            position,
            axis.tuples.len()
        ))
    })
}

// ============================================================================
// HEADER TREE
// ============================================================================

/// Builds `{titles, headers, dimensionality, cardinality}` from the axes of
/// `raw`.
///
/// When the last axis holds a single tuple it is reported as `titles`.
/// `force_min_dimensionality` (1, 2 or 3) pads missing axes with single
/// placeholder headers named "Row" and "Page".
///
/// Axes are validated against their cardinality first (see
/// [`CellsetGeometry::resolve_axes`]); `top` is the `$top` the tuples were
/// fetched with.
pub fn header_tree(raw: &RawCellset, force_min_dimensionality: usize, top: Option<usize>) -> Result<HeaderMap> {
    if !(1..=3).contains(&force_min_dimensionality) {
        return Err(CellsetError::Configuration(format!(
            "header dimensionality must be 1, 2 or 3, got {}",
            force_min_dimensionality
        )));
    }
    CellsetGeometry::resolve_axes(&raw.axes, top)?;

    let axis_count = raw.axes.len();
    let mut titles = Vec::new();
    let mut headers: Vec<Vec<Header>> = Vec::new();

    for (position, axis) in raw.axes.iter().enumerate() {
        let axis_headers = axis
            .tuples
            .iter()
            .map(header_from_tuple)
            .collect::<Result<Vec<_>>>()?;

        if position == axis_count - 1 && axis_headers.len() == 1 {
            titles = axis_headers;
        } else {
            headers.push(axis_headers);
        }
    }

    if headers.is_empty() && force_min_dimensionality > 1 {
        headers.push(vec![Header::placeholder(COLUMN_PLACEHOLDER)]);
    }
    if headers.len() == 1 && force_min_dimensionality > 1 {
        headers.push(vec![Header::placeholder(ROW_PLACEHOLDER)]);
    }
    if headers.len() == 2 && force_min_dimensionality > 2 {
        headers.push(vec![Header::placeholder(PAGE_PLACEHOLDER)]);
    }

    let cardinality = headers.iter().map(Vec::len).collect();
    Ok(HeaderMap {
        titles,
        dimensionality: headers.len(),
        headers,
        cardinality,
    })
}

fn header_from_tuple(tuple: &AxisTuple) -> Result<Header> {
    let names = tuple
        .members
        .iter()
        .map(|member| member.display_name())
        .collect::<Result<Vec<_>>>()?;
    Ok(Header {
        name: names.join(" / "),
        members: tuple.members.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Member;

    fn member(dim: &str, elem: &str) -> Member {
        Member {
            name: Some(elem.to_string()),
            unique_name: Some(format!("[{}].[{}].[{}]", dim, dim, elem)),
            ..Default::default()
        }
    }

    fn axis(tuples: Vec<Vec<Member>>) -> Axis {
        Axis {
            cardinality: tuples.len(),
            tuples: tuples
                .into_iter()
                .map(|members| AxisTuple { members, ..Default::default() })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ordinal_law_characterization() {
        // R = 2 tuples on axis 0, C = 3 tuples on axis 1.
        let axes = vec![
            axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]]),
            axis(vec![
                vec![member("B", "b0")],
                vec![member("B", "b1")],
                vec![member("B", "b2")],
            ]),
        ];
        let geometry = CellsetGeometry::resolve_axes(&axes, None).unwrap();
        let resolver = geometry.coordinate_resolver(&["A", "B"]).unwrap();

        for ordinal in 0..6 {
            let (index_rows, index_columns) = resolver.tuple_indices(ordinal);
            assert_eq!(index_rows, (ordinal / 2) % 3);
            assert_eq!(index_columns, ordinal % 2);

            let coordinates = resolver.coordinates(ordinal).unwrap();
            assert_eq!(
                coordinates,
                vec![
                    format!("[A].[A].[a{}]", ordinal % 2),
                    format!("[B].[B].[b{}]", (ordinal / 2) % 3),
                ]
            );
        }
        assert_eq!(geometry.cell_count(), 6);
    }

    #[test]
    fn test_degenerate_axes_count_as_one() {
        let axes = vec![
            axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]]),
            Axis::default(),
        ];
        let geometry = CellsetGeometry::resolve_axes(&axes, None).unwrap();
        assert!(geometry.column_axis.is_none());
        assert_eq!(geometry.column_cardinality(), 1);

        let resolver = geometry.coordinate_resolver(&["A"]).unwrap();
        assert_eq!(resolver.coordinates(1).unwrap(), vec!["[A].[A].[a1]"]);
    }

    #[test]
    fn test_only_axis_one_present() {
        let axes = vec![
            Axis::default(),
            axis(vec![vec![member("B", "b0")], vec![member("B", "b1")]]),
        ];
        let geometry = CellsetGeometry::resolve_axes(&axes, None).unwrap();
        let resolver = geometry.coordinate_resolver(&["B"]).unwrap();
        assert_eq!(resolver.coordinates(1).unwrap(), vec!["[B].[B].[b1]"]);
    }

    #[test]
    fn test_cardinality_mismatch_is_malformed() {
        let mut bad = axis(vec![vec![member("A", "a0")]]);
        bad.cardinality = 4;
        let axes = vec![bad];
        let err = CellsetGeometry::resolve_axes(&axes, None).unwrap_err();
        assert!(matches!(err, CellsetError::MalformedCellset(_)));
    }

    #[test]
    fn test_top_truncated_tuples_are_accepted() {
        let mut truncated = axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]]);
        truncated.cardinality = 10;
        let axes = vec![truncated];
        assert!(CellsetGeometry::resolve_axes(&axes, Some(2)).is_ok());
        assert!(CellsetGeometry::resolve_axes(&axes, Some(3)).is_err());
    }

    #[test]
    fn test_zero_top_means_no_limit() {
        let mut full = axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]]);
        full.cardinality = 2;
        let axes = vec![full];
        assert!(CellsetGeometry::resolve_axes(&axes, Some(0)).is_ok());

        let mut short = axis(vec![vec![member("A", "a0")]]);
        short.cardinality = 2;
        let axes = vec![short];
        assert!(CellsetGeometry::resolve_axes(&axes, Some(0)).is_err());
    }

    #[test]
    fn test_title_fragments_are_constant() {
        let axes = vec![
            axis(vec![vec![member("C", "c0")], vec![member("C", "c1")]]),
            axis(vec![vec![member("B", "b0")]]),
            axis(vec![vec![member("A", "title")]]),
        ];
        let geometry = CellsetGeometry::resolve_axes(&axes, None).unwrap();
        let resolver = geometry.coordinate_resolver(&["A", "B", "C"]).unwrap();
        for ordinal in 0..2 {
            let coordinates = resolver.coordinates(ordinal).unwrap();
            assert_eq!(coordinates[0], "[A].[A].[title]");
        }
    }

    fn named_cellset(axes: Vec<Axis>) -> RawCellset {
        RawCellset {
            axes,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_tree_joins_stacked_member_names() {
        let raw = named_cellset(vec![axis(vec![
            vec![member("A", "a0"), member("B", "b0")],
            vec![member("A", "a1"), member("B", "b0")],
        ])]);
        let map = header_tree(&raw, 1, None).unwrap();
        assert_eq!(map.headers.len(), 1);
        assert_eq!(map.name(0, 0), Some("a0 / b0"));
        assert_eq!(map.headers[0][1].members.len(), 2);
        assert_eq!(map.cardinality, vec![2]);
    }

    #[test]
    fn test_header_tree_moves_single_tuple_last_axis_to_titles() {
        let raw = named_cellset(vec![
            axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]]),
            axis(vec![vec![member("B", "b0")], vec![member("B", "b1")]]),
            axis(vec![vec![member("C", "c0")]]),
        ]);
        let map = header_tree(&raw, 1, None).unwrap();
        assert_eq!(map.titles.len(), 1);
        assert_eq!(map.titles[0].name, "c0");
        assert_eq!(map.dimensionality, 2);
        assert_eq!(map.cardinality, vec![2, 2]);
    }

    #[test]
    fn test_header_tree_pads_to_three_axes() {
        let raw = named_cellset(vec![axis(vec![vec![member("A", "a0")], vec![member("A", "a1")]])]);
        let map = header_tree(&raw, 3, None).unwrap();
        assert_eq!(map.dimensionality, 3);
        assert_eq!(map.cardinality, vec![2, 1, 1]);
        assert_eq!(map.name(1, 0), Some("Row"));
        assert_eq!(map.name(2, 0), Some("Page"));

        let map = header_tree(&raw, 2, None).unwrap();
        assert_eq!(map.dimensionality, 2);
    }

    #[test]
    fn test_header_tree_rejects_invalid_dimensionality() {
        let raw = named_cellset(Vec::new());
        assert!(matches!(header_tree(&raw, 0, None), Err(CellsetError::Configuration(_))));
        assert!(matches!(header_tree(&raw, 4, None), Err(CellsetError::Configuration(_))));
    }

    #[test]
    fn test_header_tree_rejects_cardinality_mismatch() {
        let mut rows = axis(vec![vec![member("B", "b0")], vec![member("B", "b1")]]);
        rows.cardinality = 5;
        let raw = named_cellset(vec![axis(vec![vec![member("A", "a0")]]), rows]);
        let err = header_tree(&raw, 3, None).unwrap_err();
        assert!(matches!(err, CellsetError::MalformedCellset(_)));
    }

    #[test]
    fn test_header_tree_accepts_top_truncated_axis() {
        let mut rows = axis(vec![vec![member("B", "b0")], vec![member("B", "b1")]]);
        rows.cardinality = 5;
        let raw = named_cellset(vec![axis(vec![vec![member("A", "a0")]]), rows]);
        let map = header_tree(&raw, 3, Some(2)).unwrap();
        assert_eq!(map.cardinality, vec![1, 2, 1]);
    }
}
