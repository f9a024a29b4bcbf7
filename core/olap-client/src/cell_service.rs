//! FILENAME: core/olap-client/src/cell_service.rs
//! PURPOSE: Read and write cube cells through server-side cellsets.
//! CONTEXT: A query (MDX or a stored view) is executed into a cellset on the
//! server, the cellset is fetched with exactly the properties an output shape
//! needs, and the payload is handed to the cellset engine. Every extraction
//! releases the cellset afterwards unless the caller opts out to chain
//! several extractions over the same cellset.

use serde_json::json;

use cellset_engine::{
    dimension_hierarchy_element_from_unique_name, dimension_name_from_element_unique_name,
    parse_cell_count, project_cells, project_rows_and_values, project_to_coordinate_map,
    project_to_flat_table, project_to_nested_arrays, project_to_value_stream,
    string_set_from_rows_and_values, to_rows, Cell, CellValue, CellsetComposition, FlatTable,
    NestedArrayOptions, NestedArrays, PivotOptions, PivotTable, RawCellset, Table, TableOptions,
    ValueStream,
};
use insensitive::{case_and_space_insensitive_equals, InsensitiveSet, InsensitiveTupleMapping};

use crate::cube_service::CubeService;
use crate::error::{ClientError, Result};
use crate::logging::{log_debug, log_enter, log_exit, log_warn};
use crate::object_service::ObjectService;
use crate::rest::{RestService, Transport};
use crate::url::format_url;

pub const CUBE_PROPERTIES_CUBE: &str = "}CubeProperties";

/// Precision applied by the chart and grid executions unless told otherwise.
pub const DEFAULT_VALUE_PRECISION: usize = 2;

// ============================================================================
// QUERY DEFINITIONS
// ============================================================================

/// What to execute into a cellset.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    Mdx(String),
    View {
        cube: String,
        view: String,
        private: bool,
    },
}

impl QuerySource {
    pub fn mdx(mdx: impl Into<String>) -> Self {
        QuerySource::Mdx(mdx.into())
    }

    pub fn view(cube: impl Into<String>, view: impl Into<String>, private: bool) -> Self {
        QuerySource::View {
            cube: cube.into(),
            view: view.into(),
            private,
        }
    }
}

/// Which parts of a cellset to fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellsetQuery {
    /// Cell properties; `Value` when empty.
    pub cell_properties: Vec<String>,

    /// Element properties expanded under each member; none when empty.
    pub elem_properties: Vec<String>,

    /// Member properties; `Name` when empty, since the server returns every
    /// property without a `$select`.
    pub member_properties: Vec<String>,

    /// Limit on cells and on tuples per axis.
    pub top: Option<usize>,

    /// Leave out the title axis.
    pub skip_contexts: bool,
}

impl CellsetQuery {
    pub fn with_cell_properties<S: Into<String>>(mut self, properties: impl IntoIterator<Item = S>) -> Self {
        self.cell_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_skip_contexts(mut self, skip: bool) -> Self {
        self.skip_contexts = skip;
        self
    }

    /// `Cellsets(...)` URL expanding cube dimensions, axes and cells.
    pub fn url(&self, cellset_id: &str) -> String {
        let cell_properties = if self.cell_properties.is_empty() {
            "Value".to_string()
        } else {
            self.cell_properties.join(",")
        };
        let member_properties = if self.member_properties.is_empty() {
            "Name".to_string()
        } else {
            self.member_properties.join(",")
        };
        let expand_elem_properties = if self.elem_properties.is_empty() {
            String::new()
        } else {
            format!(";$expand=Element($select={})", self.elem_properties.join(","))
        };
        let filter_axis = if self.skip_contexts { "$filter=Ordinal ne 2;" } else { "" };
        let top = match self.top {
            Some(top) if top > 0 => format!(";$top={}", top),
            _ => String::new(),
        };

        format!(
            "{}?$expand=Cube($select=Name;$expand=Dimensions($select=Name)),\
             Axes({}$expand=Tuples($expand=Members($select={}{}){})),\
             Cells($select={}{})",
            format_url("/api/v1/Cellsets('{}')", &[cellset_id]),
            filter_axis,
            member_properties,
            expand_elem_properties,
            top,
            cell_properties,
            top,
        )
    }

    /// Member and element unique names, as coordinate reconstruction needs.
    fn for_coordinates(&self) -> Self {
        Self {
            cell_properties: self.cell_properties.clone(),
            elem_properties: vec!["UniqueName".to_string()],
            member_properties: vec!["UniqueName".to_string()],
            top: self.top,
            skip_contexts: self.skip_contexts,
        }
    }

    /// Cell values plus member names, as header trees need.
    fn for_nested_arrays(&self) -> Self {
        let mut member_properties = self.member_properties.clone();
        if !member_properties
            .iter()
            .any(|p| case_and_space_insensitive_equals(p, "Name"))
        {
            member_properties.push("Name".to_string());
        }
        Self {
            cell_properties: vec!["Value".to_string()],
            elem_properties: self.elem_properties.clone(),
            member_properties,
            top: self.top,
            skip_contexts: self.skip_contexts,
        }
    }
}

// ============================================================================
// RELEASE GUARD
// ============================================================================

/// Releases the cellset if the extraction unwinds before it could.
struct CellsetLease<'s, 'a, T: Transport> {
    service: &'s CellService<'a, T>,
    cellset_id: &'s str,
    armed: bool,
}

impl<T: Transport> Drop for CellsetLease<'_, '_, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.service.delete_cellset(self.cellset_id) {
                log_warn!("CELLSET", "Could not release cellset {}: {}", self.cellset_id, e);
            }
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct CellService<'a, T: Transport> {
    object: ObjectService<'a, T>,
}

impl<'a, T: Transport> CellService<'a, T> {
    pub fn new(rest: &'a RestService<T>) -> Self {
        Self {
            object: ObjectService::new(rest),
        }
    }

    fn rest(&self) -> &'a RestService<T> {
        self.object.rest()
    }

    /// Runs `body`, then deletes the cellset if `delete_cellset` is set.
    ///
    /// The cellset is deleted exactly once on every exit path. A failure of
    /// `body` wins over a failure of the delete.
    pub fn tidy_cellset<R>(
        &self,
        cellset_id: &str,
        delete_cellset: bool,
        body: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let mut lease = CellsetLease {
            service: self,
            cellset_id,
            armed: delete_cellset,
        };
        let result = body();
        if !lease.armed {
            return result;
        }
        lease.armed = false;
        match (result, self.delete_cellset(cellset_id)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_error)) => Err(release_error),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_error)) => {
                log_warn!(
                    "CELLSET",
                    "Could not release cellset {} after failure: {}",
                    cellset_id,
                    release_error
                );
                Err(e)
            }
        }
    }

    // ========================================================================
    // CELLSET LIFECYCLE
    // ========================================================================

    /// Executes MDX into a server-side cellset and returns its id.
    pub fn create_cellset(&self, mdx: &str) -> Result<String> {
        let payload = json!({ "MDX": mdx });
        let response = self.rest().post("/api/v1/ExecuteMDX", &payload.to_string())?;
        cellset_id_from(&response.json()?)
    }

    pub fn create_cellset_from_view(&self, cube_name: &str, view_name: &str, private: bool) -> Result<String> {
        let views = if private { "PrivateViews" } else { "Views" };
        let url = format_url(
            &format!("/api/v1/Cubes('{{}}')/{}('{{}}')/tm1.Execute", views),
            &[cube_name, view_name],
        );
        let response = self.rest().post(&url, "")?;
        cellset_id_from(&response.json()?)
    }

    pub fn create_cellset_from_source(&self, source: &QuerySource) -> Result<String> {
        let cellset_id = match source {
            QuerySource::Mdx(mdx) => self.create_cellset(mdx)?,
            QuerySource::View { cube, view, private } => {
                self.create_cellset_from_view(cube, view, *private)?
            }
        };
        log_debug!("CELLSET", "Created cellset {}", cellset_id);
        Ok(cellset_id)
    }

    pub fn delete_cellset(&self, cellset_id: &str) -> Result<()> {
        let url = format_url("/api/v1/Cellsets('{}')", &[cellset_id]);
        self.rest().delete(&url)?;
        log_debug!("CELLSET", "Released cellset {}", cellset_id);
        Ok(())
    }

    // ========================================================================
    // EXTRACTION
    // ========================================================================

    /// Fetches the cellset payload as selected by `query`.
    pub fn extract_cellset_raw(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        delete_cellset: bool,
    ) -> Result<RawCellset> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let response = self.rest().get(&query.url(cellset_id))?;
            Ok(RawCellset::from_json(response.text())?)
        })
    }

    /// Coordinate (element unique names in cube order) to cell value.
    pub fn extract_cellset(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        delete_cellset: bool,
    ) -> Result<InsensitiveTupleMapping<CellValue>> {
        log_enter!("CELLSET", "extract_cellset", "cellset_id={}", cellset_id);
        let raw = self.extract_cellset_raw(cellset_id, &query.for_coordinates(), delete_cellset)?;
        let content = project_to_coordinate_map(&raw, query.top)?;
        log_exit!("CELLSET", "extract_cellset", "cells={}", content.len());
        Ok(content)
    }

    /// Coordinate to the whole cell, including the requested cell properties.
    pub fn extract_cellset_cells(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        delete_cellset: bool,
    ) -> Result<InsensitiveTupleMapping<Cell>> {
        let raw = self.extract_cellset_raw(cellset_id, &query.for_coordinates(), delete_cellset)?;
        Ok(project_cells(&raw, query.top)?)
    }

    /// Cell values only, in ordinal order. No coordinates are rebuilt.
    pub fn extract_cellset_values(&self, cellset_id: &str, delete_cellset: bool) -> Result<ValueStream> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format_url("/api/v1/Cellsets('{}')?$expand=Cells($select=Value)", &[cellset_id]);
            let raw = RawCellset::from_json(self.rest().get(&url)?.text())?;
            Ok(project_to_value_stream(raw))
        })
    }

    /// Row tuple to the values across that row.
    pub fn extract_cellset_rows_and_values(
        &self,
        cellset_id: &str,
        element_unique_names: bool,
        delete_cellset: bool,
    ) -> Result<InsensitiveTupleMapping<Vec<CellValue>>> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let element_property = if element_unique_names { "UniqueName" } else { "Name" };
            let url = format!(
                "{}?$expand=Axes($filter=Ordinal eq 1;$expand=Tuples(\
                 $expand=Members($select=Element;$expand=Element($select={})))),\
                 Cells($select=Value)",
                format_url("/api/v1/Cellsets('{}')", &[cellset_id]),
                element_property
            );
            let raw = RawCellset::from_json(self.rest().get(&url)?.text())?;
            Ok(project_rows_and_values(&raw, element_unique_names)?)
        })
    }

    /// Cube name and hierarchy unique names on each axis.
    pub fn extract_cellset_composition(
        &self,
        cellset_id: &str,
        delete_cellset: bool,
    ) -> Result<CellsetComposition> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format_url(
                "/api/v1/Cellsets('{}')?$expand=Cube($select=Name),Axes($expand=Hierarchies($select=UniqueName))",
                &[cellset_id],
            );
            let raw = RawCellset::from_json(self.rest().get(&url)?.text())?;
            Ok(CellsetComposition::from_raw(&raw)?)
        })
    }

    pub fn extract_cellset_cellcount(&self, cellset_id: &str, delete_cellset: bool) -> Result<usize> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format_url("/api/v1/Cellsets('{}')/Cells/$count", &[cellset_id]);
            Ok(parse_cell_count(self.rest().get(&url)?.text())?)
        })
    }

    /// Server-rendered CSV of coordinates and values.
    ///
    /// Title dimensions and null cells are left out by the server.
    pub fn extract_cellset_csv(&self, cellset_id: &str, delete_cellset: bool) -> Result<String> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format_url("/api/v1/Cellsets('{}')/Content", &[cellset_id]);
            Ok(self.rest().get(&url)?.body)
        })
    }

    /// The server `Content` CSV read into a table.
    pub fn extract_cellset_table_csv(&self, cellset_id: &str, delete_cellset: bool) -> Result<Table> {
        let csv = self.extract_cellset_csv(cellset_id, delete_cellset)?;
        let table = Table::from_csv(&csv)?;
        log_debug!("CELLSET", "Read {} rows from content of cellset {}", table.rows.len(), cellset_id);
        Ok(table)
    }

    /// One row per cell: element names per dimension plus the value.
    pub fn extract_cellset_table(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        options: TableOptions,
        delete_cellset: bool,
    ) -> Result<Table> {
        let content = self.extract_cellset(cellset_id, query, delete_cellset)?;
        Ok(to_rows(&content, options)?)
    }

    /// Cross-tab in the shape of the query: row-axis dimensions down,
    /// column-axis dimensions across, values summed.
    pub fn extract_cellset_table_pivot(
        &self,
        cellset_id: &str,
        options: PivotOptions,
        delete_cellset: bool,
    ) -> Result<PivotTable> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let content = self.extract_cellset(cellset_id, &CellsetQuery::default(), false)?;
            let composition = self.extract_cellset_composition(cellset_id, false)?;
            let table = to_rows(&content, TableOptions::default())?;
            let dimension_names = |hierarchies: &[String]| -> Vec<String> {
                hierarchies
                    .iter()
                    .map(|h| dimension_name_from_element_unique_name(h).to_string())
                    .collect()
            };
            Ok(table.pivot(
                &dimension_names(&composition.rows),
                &dimension_names(&composition.columns),
                options,
            )?)
        })
    }

    /// Chart shape: per page, one row per column header with the values
    /// across the row headers.
    pub fn extract_cellset_ui_dygraph(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        value_precision: Option<usize>,
        delete_cellset: bool,
    ) -> Result<NestedArrays> {
        let raw = self.extract_cellset_raw(cellset_id, &query.for_nested_arrays(), delete_cellset)?;
        let options = NestedArrayOptions {
            top: query.top,
            ..NestedArrayOptions::dygraph(value_precision)
        };
        Ok(project_to_nested_arrays(&raw, options)?)
    }

    /// Grid shape: per page, each row header mapped to its values.
    pub fn extract_cellset_ui_array(
        &self,
        cellset_id: &str,
        query: &CellsetQuery,
        value_precision: Option<usize>,
        delete_cellset: bool,
    ) -> Result<NestedArrays> {
        let raw = self.extract_cellset_raw(cellset_id, &query.for_nested_arrays(), delete_cellset)?;
        let options = NestedArrayOptions {
            top: query.top,
            ..NestedArrayOptions::ui_array(value_precision)
        };
        Ok(project_to_nested_arrays(&raw, options)?)
    }

    /// Flat table for BI tools: row-axis element names, then the values across
    /// the column-axis tuples.
    pub fn extract_cellset_power_bi(&self, cellset_id: &str, delete_cellset: bool) -> Result<FlatTable> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format!(
                "{}?$expand=Axes($filter=Ordinal eq 0 or Ordinal eq 1;\
                 $expand=Tuples($expand=Members($select=Name)),Hierarchies($select=Name)),\
                 Cells($select=Value)",
                format_url("/api/v1/Cellsets('{}')", &[cellset_id])
            );
            let raw = RawCellset::from_json(self.rest().get(&url)?.text())?;
            Ok(project_to_flat_table(&raw)?)
        })
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    pub fn execute(&self, source: &QuerySource, query: &CellsetQuery) -> Result<InsensitiveTupleMapping<CellValue>> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset(&cellset_id, query, true)
    }

    pub fn execute_mdx(&self, mdx: &str, query: &CellsetQuery) -> Result<InsensitiveTupleMapping<CellValue>> {
        self.execute(&QuerySource::mdx(mdx), query)
    }

    pub fn execute_view(
        &self,
        cube_name: &str,
        view_name: &str,
        private: bool,
        query: &CellsetQuery,
    ) -> Result<InsensitiveTupleMapping<CellValue>> {
        self.execute(&QuerySource::view(cube_name, view_name, private), query)
    }

    pub fn execute_cells(&self, source: &QuerySource, query: &CellsetQuery) -> Result<InsensitiveTupleMapping<Cell>> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_cells(&cellset_id, query, true)
    }

    pub fn execute_raw(&self, source: &QuerySource, query: &CellsetQuery) -> Result<RawCellset> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_raw(&cellset_id, query, true)
    }

    pub fn execute_values(&self, source: &QuerySource) -> Result<ValueStream> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_values(&cellset_id, true)
    }

    pub fn execute_rows_and_values(
        &self,
        source: &QuerySource,
        element_unique_names: bool,
    ) -> Result<InsensitiveTupleMapping<Vec<CellValue>>> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_rows_and_values(&cellset_id, element_unique_names, true)
    }

    /// Row element names and string cell values in one insensitive set.
    pub fn execute_rows_and_values_string_set(
        &self,
        source: &QuerySource,
        exclude_empty_cells: bool,
    ) -> Result<InsensitiveSet> {
        let rows_and_values = self.execute_rows_and_values(source, false)?;
        Ok(string_set_from_rows_and_values(&rows_and_values, exclude_empty_cells))
    }

    pub fn execute_csv(&self, source: &QuerySource) -> Result<String> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_csv(&cellset_id, true)
    }

    pub fn execute_table_csv(&self, source: &QuerySource) -> Result<Table> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_table_csv(&cellset_id, true)
    }

    pub fn execute_power_bi(&self, source: &QuerySource) -> Result<FlatTable> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_power_bi(&cellset_id, true)
    }

    pub fn execute_table(&self, source: &QuerySource, query: &CellsetQuery, options: TableOptions) -> Result<Table> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_table(&cellset_id, query, options, true)
    }

    pub fn execute_table_pivot(&self, source: &QuerySource, options: PivotOptions) -> Result<PivotTable> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_table_pivot(&cellset_id, options, true)
    }

    pub fn execute_cellcount(&self, source: &QuerySource) -> Result<usize> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_cellcount(&cellset_id, true)
    }

    pub fn execute_ui_dygraph(
        &self,
        source: &QuerySource,
        query: &CellsetQuery,
        value_precision: Option<usize>,
    ) -> Result<NestedArrays> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_ui_dygraph(&cellset_id, query, value_precision, true)
    }

    pub fn execute_ui_array(
        &self,
        source: &QuerySource,
        query: &CellsetQuery,
        value_precision: Option<usize>,
    ) -> Result<NestedArrays> {
        let cellset_id = self.create_cellset_from_source(source)?;
        self.extract_cellset_ui_array(&cellset_id, query, value_precision, true)
    }

    // ========================================================================
    // READ SINGLE VALUE
    // ========================================================================

    /// Reads one cell addressed by an element string.
    ///
    /// `element_string` lists one selection per dimension in cube order,
    /// separated by `,`. A selection is an element of the default hierarchy,
    /// or `hierarchy::element` parts joined with `&&`.
    pub fn get_value(
        &self,
        cube_name: &str,
        element_string: &str,
        dimensions: Option<&[String]>,
    ) -> Result<CellValue> {
        let dimensions = match dimensions {
            Some(dimensions) if !dimensions.is_empty() => dimensions.to_vec(),
            _ => CubeService::new(self.rest()).get(cube_name)?.dimensions,
        };
        let mdx = build_single_cell_mdx(cube_name, element_string, &dimensions)?;
        let content = self.execute_mdx(&mdx, &CellsetQuery::default())?;
        content
            .first()
            .map(|(_, value)| value.clone())
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("no cell returned for {}", element_string)))
    }

    // ========================================================================
    // WRITE-BACK
    // ========================================================================

    pub fn get_dimension_names_for_writing(&self, cube_name: &str) -> Result<Vec<String>> {
        CubeService::new(self.rest()).get_dimension_names(cube_name, true)
    }

    fn resolve_write_dimensions(&self, cube_name: &str, dimensions: Option<&[String]>) -> Result<Vec<String>> {
        match dimensions {
            Some(dimensions) if !dimensions.is_empty() => Ok(dimensions.to_vec()),
            _ => self.get_dimension_names_for_writing(cube_name),
        }
    }

    /// Writes one value at the given element names (one per dimension).
    pub fn write_value<S: AsRef<str>>(
        &self,
        value: impl Into<CellValue>,
        cube_name: &str,
        element_tuple: &[S],
        dimensions: Option<&[String]>,
    ) -> Result<()> {
        let dimensions = self.resolve_write_dimensions(cube_name, dimensions)?;
        let url = format_url("/api/v1/Cubes('{}')/tm1.Update", &[cube_name]);
        let update = cell_update(&dimensions, element_tuple, &value.into());
        self.rest().post(&url, &update.to_string())?;
        Ok(())
    }

    /// Writes many values in one request. Keys are element-name tuples.
    pub fn write_values(
        &self,
        cube_name: &str,
        cellset: &InsensitiveTupleMapping<CellValue>,
        dimensions: Option<&[String]>,
    ) -> Result<()> {
        let dimensions = self.resolve_write_dimensions(cube_name, dimensions)?;
        let url = format_url("/api/v1/Cubes('{}')/tm1.Update", &[cube_name]);
        let updates: Vec<serde_json::Value> = cellset
            .iter()
            .map(|(elements, value)| cell_update(&dimensions, elements.as_slice(), value))
            .collect();
        log_debug!("CELLSET", "Writing {} cells to {}", updates.len(), cube_name);
        self.rest().post(&url, &serde_json::Value::Array(updates).to_string())?;
        Ok(())
    }

    /// Writes `values` into the cells of an MDX query, in ordinal order.
    pub fn write_values_through_cellset(&self, mdx: &str, values: &[CellValue]) -> Result<()> {
        let cellset_id = self.create_cellset(mdx)?;
        self.update_cellset(&cellset_id, values, true)
    }

    /// Overwrites cells of an existing cellset by ordinal.
    pub fn update_cellset(&self, cellset_id: &str, values: &[CellValue], delete_cellset: bool) -> Result<()> {
        self.tidy_cellset(cellset_id, delete_cellset, || {
            let url = format_url("/api/v1/Cellsets('{}')/Cells", &[cellset_id]);
            let updates: Vec<serde_json::Value> = values
                .iter()
                .enumerate()
                .map(|(ordinal, value)| json!({ "Ordinal": ordinal, "Value": value }))
                .collect();
            self.rest().patch(&url, &serde_json::Value::Array(updates).to_string())?;
            Ok(())
        })
    }

    /// Spreads `value` over the target cell in proportion to the reference cell.
    pub fn relative_proportional_spread<S: AsRef<str>>(
        &self,
        value: f64,
        cube: &str,
        unique_element_names: &[S],
        reference_unique_element_names: &[S],
        reference_cube: Option<&str>,
    ) -> Result<()> {
        let cellset_id = self.create_cellset(&spread_target_mdx(cube, unique_element_names))?;
        let payload = json!({
            "BeginOrdinal": 0,
            "Value": format!("RP{}", value),
            "ReferenceCell@odata.bind": element_bindings(reference_unique_element_names),
            "ReferenceCube@odata.bind": format_url("Cubes('{}')", &[reference_cube.unwrap_or(cube)]),
        });
        self.post_against_cellset(&cellset_id, &payload)
    }

    /// Clears the target cell and every leaf below it.
    pub fn clear_spread<S: AsRef<str>>(&self, cube: &str, unique_element_names: &[S]) -> Result<()> {
        let cellset_id = self.create_cellset(&spread_target_mdx(cube, unique_element_names))?;
        let payload = json!({
            "BeginOrdinal": 0,
            "Value": "C",
            "ReferenceCell@odata.bind": element_bindings(unique_element_names),
        });
        self.post_against_cellset(&cellset_id, &payload)
    }

    fn post_against_cellset(&self, cellset_id: &str, payload: &serde_json::Value) -> Result<()> {
        self.tidy_cellset(cellset_id, true, || {
            let url = format_url("/api/v1/Cellsets('{}')/tm1.Update", &[cellset_id]);
            self.rest().post(&url, &payload.to_string())?;
            Ok(())
        })
    }

    pub fn activate_transactionlog<S: AsRef<str>>(&self, cube_names: &[S]) -> Result<()> {
        self.set_transactionlog(cube_names, "YES")
    }

    pub fn deactivate_transactionlog<S: AsRef<str>>(&self, cube_names: &[S]) -> Result<()> {
        self.set_transactionlog(cube_names, "NO")
    }

    fn set_transactionlog<S: AsRef<str>>(&self, cube_names: &[S], flag: &str) -> Result<()> {
        let updates: InsensitiveTupleMapping<CellValue> = cube_names
            .iter()
            .map(|cube| {
                (
                    vec![cube.as_ref().to_string(), "Logging".to_string()],
                    CellValue::from(flag),
                )
            })
            .collect();
        self.write_values(CUBE_PROPERTIES_CUBE, &updates, None)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn cellset_id_from(response: &serde_json::Value) -> Result<String> {
    response
        .get("ID")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::UnexpectedResponse("cellset response without ID".to_string()))
}

fn element_binding(dimension: &str, hierarchy: &str, element: &str) -> String {
    format_url(
        "Dimensions('{}')/Hierarchies('{}')/Elements('{}')",
        &[dimension, hierarchy, element],
    )
}

fn element_bindings<S: AsRef<str>>(unique_element_names: &[S]) -> Vec<String> {
    unique_element_names
        .iter()
        .map(|unique_name| {
            let (dimension, hierarchy, element) =
                dimension_hierarchy_element_from_unique_name(unique_name.as_ref());
            element_binding(dimension, hierarchy, element)
        })
        .collect()
}

/// One `tm1.Update` entry addressing elements of the default hierarchies.
fn cell_update<S: AsRef<str>>(dimensions: &[String], elements: &[S], value: &CellValue) -> serde_json::Value {
    let bindings: Vec<String> = dimensions
        .iter()
        .zip(elements)
        .map(|(dimension, element)| element_binding(dimension, dimension, element.as_ref()))
        .collect();
    json!({
        "Cells": [{ "Tuple@odata.bind": bindings }],
        "Value": value.to_update_string(),
    })
}

fn spread_target_mdx<S: AsRef<str>>(cube: &str, unique_element_names: &[S]) -> String {
    let members: Vec<&str> = unique_element_names.iter().map(AsRef::as_ref).collect();
    format!("SELECT {{ {} }} ON 0 FROM [{}]", members.join("}*{"), cube)
}

/// MDX selecting a single cell: the last dimension on columns, all others
/// cross-joined on rows.
fn build_single_cell_mdx(cube_name: &str, element_string: &str, dimensions: &[String]) -> Result<String> {
    let selections: Vec<&str> = element_string.split(',').map(str::trim).collect();
    if selections.len() != dimensions.len() {
        return Err(ClientError::Config(format!(
            "element string has {} selections but cube {} has {} dimensions",
            selections.len(),
            cube_name,
            dimensions.len()
        )));
    }

    let mut sets = Vec::with_capacity(selections.len());
    for (dimension, selection) in dimensions.iter().zip(&selections) {
        let mut parts = Vec::new();
        if selection.contains("&&") {
            for part in selection.split("&&") {
                let (hierarchy, element) = part.trim().split_once("::").ok_or_else(|| {
                    ClientError::Config(format!("expected hierarchy::element, got {}", part.trim()))
                })?;
                parts.push(format!("{{[{}].[{}].[{}]}}", dimension, hierarchy, element));
            }
        } else {
            parts.push(format!("{{[{}].[{}].[{}]}}", dimension, dimension, selection));
        }
        sets.push(parts);
    }

    let Some(columns) = sets.pop() else {
        return Err(ClientError::Config(format!("cube {} has no dimensions", cube_name)));
    };
    let rows: Vec<String> = sets.into_iter().flatten().collect();
    Ok(format!(
        "SELECT {} ON ROWS, {} ON COLUMNS FROM [{}]",
        rows.join("*"),
        columns.join("*"),
        cube_name
    ))
}
