//! FILENAME: core/olap-client/src/cube_service.rs
//! PURPOSE: Create, read, update and delete cubes.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::logging::{log_debug, log_info};
use crate::object_service::{NamedEntry, ObjectService, ValueList, SANDBOX_DIMENSION};
use crate::rest::{RestService, Transport};
use crate::url::format_url;

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CubeDefinition {
    name: String,
    #[serde(default)]
    dimensions: Vec<NamedDimension>,
    #[serde(default)]
    rules: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedDimension {
    name: String,
}

/// A cube: its name, dimensions in cube order, and rules text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cube {
    pub name: String,
    pub dimensions: Vec<String>,
    pub rules: Option<String>,
}

impl Cube {
    pub fn new(name: impl Into<String>, dimensions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let definition: CubeDefinition = serde_json::from_str(text)?;
        Ok(definition.into())
    }

    pub fn has_rules(&self) -> bool {
        self.rules.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Request body binding the dimensions by reference.
    pub fn body(&self) -> String {
        let dimensions: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| format_url("Dimensions('{}')", &[d]))
            .collect();
        let mut body = json!({
            "Name": self.name,
            "Dimensions@odata.bind": dimensions,
        });
        if let Some(rules) = &self.rules {
            body["Rules"] = json!(rules);
        }
        body.to_string()
    }
}

impl From<CubeDefinition> for Cube {
    fn from(definition: CubeDefinition) -> Self {
        Self {
            name: definition.name,
            dimensions: definition.dimensions.into_iter().map(|d| d.name).collect(),
            rules: definition.rules,
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct CubeService<'a, T: Transport> {
    object: ObjectService<'a, T>,
}

impl<'a, T: Transport> CubeService<'a, T> {
    pub fn new(rest: &'a RestService<T>) -> Self {
        Self {
            object: ObjectService::new(rest),
        }
    }

    fn rest(&self) -> &'a RestService<T> {
        self.object.rest()
    }

    fn get_cubes(&self, url: &str) -> Result<Vec<Cube>> {
        let response: ValueList<CubeDefinition> = self.rest().get(url)?.json()?;
        Ok(response.value.into_iter().map(Cube::from).collect())
    }

    fn get_names(&self, url: &str) -> Result<Vec<String>> {
        let response: ValueList<NamedEntry> = self.rest().get(url)?.json()?;
        Ok(response.value.into_iter().map(|entry| entry.name).collect())
    }

    pub fn create(&self, cube: &Cube) -> Result<()> {
        log_info!("CUBES", "Creating cube {}", cube.name);
        self.rest().post("/api/v1/Cubes", &cube.body())?;
        Ok(())
    }

    pub fn get(&self, cube_name: &str) -> Result<Cube> {
        let url = format_url("/api/v1/Cubes('{}')?$expand=Dimensions($select=Name)", &[cube_name]);
        Cube::from_json(self.rest().get(&url)?.text())
    }

    pub fn get_last_data_update(&self, cube_name: &str) -> Result<String> {
        let url = format_url("/api/v1/Cubes('{}')/LastDataUpdate/$value", &[cube_name]);
        Ok(self.rest().get(&url)?.body)
    }

    pub fn get_all(&self) -> Result<Vec<Cube>> {
        self.get_cubes("/api/v1/Cubes?$expand=Dimensions($select=Name)")
    }

    /// Cubes without the `}` control prefix.
    pub fn get_model_cubes(&self) -> Result<Vec<Cube>> {
        self.get_cubes("/api/v1/ModelCubes()?$expand=Dimensions($select=Name)")
    }

    /// Cubes with the `}` control prefix.
    pub fn get_control_cubes(&self) -> Result<Vec<Cube>> {
        self.get_cubes("/api/v1/ControlCubes()?$expand=Dimensions($select=Name)")
    }

    pub fn get_all_names(&self) -> Result<Vec<String>> {
        self.get_names("/api/v1/Cubes?$select=Name")
    }

    pub fn update(&self, cube: &Cube) -> Result<()> {
        let url = format_url("/api/v1/Cubes('{}')", &[&cube.name]);
        self.rest().patch(&url, &cube.body())?;
        Ok(())
    }

    pub fn update_or_create(&self, cube: &Cube) -> Result<()> {
        if self.exists(&cube.name)? {
            self.update(cube)
        } else {
            self.create(cube)
        }
    }

    /// Rule syntax errors reported by the server; empty when the rules compile.
    pub fn check_rules(&self, cube_name: &str) -> Result<Vec<serde_json::Value>> {
        let url = format_url("/api/v1/Cubes('{}')/tm1.CheckRules", &[cube_name]);
        let response = self.rest().post(&url, "")?;
        if response.text().trim().is_empty() {
            return Ok(Vec::new());
        }
        let errors: ValueList<serde_json::Value> = response.json()?;
        Ok(errors.value)
    }

    pub fn delete(&self, cube_name: &str) -> Result<()> {
        log_info!("CUBES", "Deleting cube {}", cube_name);
        let url = format_url("/api/v1/Cubes('{}')", &[cube_name]);
        self.rest().delete(&url)?;
        Ok(())
    }

    pub fn exists(&self, cube_name: &str) -> Result<bool> {
        self.object.exists(&format_url("/api/v1/Cubes('{}')", &[cube_name]))
    }

    /// Dimension names in cube order, optionally without the leading sandbox dimension.
    pub fn get_dimension_names(&self, cube_name: &str, skip_sandbox_dimension: bool) -> Result<Vec<String>> {
        let url = format_url("/api/v1/Cubes('{}')/Dimensions?$select=Name", &[cube_name]);
        let mut names = self.get_names(&url)?;
        if skip_sandbox_dimension && names.first().map(String::as_str) == Some(SANDBOX_DIMENSION) {
            names.remove(0);
        }
        log_debug!("CUBES", "{} dimensions: {:?}", cube_name, names);
        Ok(names)
    }

    pub fn get_storage_dimension_order(&self, cube_name: &str) -> Result<Vec<String>> {
        let url = format_url(
            "/api/v1/Cubes('{}')/tm1.DimensionsStorageOrder()?$select=Name",
            &[cube_name],
        );
        self.get_names(&url)
    }

    pub fn update_storage_dimension_order<S: AsRef<str>>(
        &self,
        cube_name: &str,
        dimension_names: &[S],
    ) -> Result<()> {
        let url = format_url("/api/v1/Cubes('{}')/tm1.ReorderDimensions", &[cube_name]);
        let dimensions: Vec<String> = dimension_names
            .iter()
            .map(|d| format_url("Dimensions('{}')", &[d.as_ref()]))
            .collect();
        let payload = json!({ "Dimensions@odata.bind": dimensions });
        self.rest().post(&url, &payload.to_string())?;
        Ok(())
    }

    /// Loads the cube into server memory.
    pub fn load(&self, cube_name: &str) -> Result<()> {
        let url = format_url("/api/v1/Cubes('{}')/tm1.Load", &[cube_name]);
        self.rest().post(&url, "")?;
        Ok(())
    }

    pub fn unload(&self, cube_name: &str) -> Result<()> {
        let url = format_url("/api/v1/Cubes('{}')/tm1.Unload", &[cube_name]);
        self.rest().post(&url, "")?;
        Ok(())
    }

    pub fn determine_actual_name(&self, cube_name: &str) -> Result<String> {
        self.object.determine_actual_object_name("Cubes", cube_name)
    }
}
