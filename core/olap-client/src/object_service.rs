//! FILENAME: core/olap-client/src/object_service.rs
//! Shared plumbing for the object services.

use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::rest::{RestService, Transport};
use crate::url::format_url;
use insensitive::lower_and_drop_spaces;

pub const ELEMENT_ATTRIBUTES_PREFIX: &str = "}ElementAttributes_";
pub const SANDBOX_DIMENSION: &str = "Sandboxes";

/// Generic `{"value": [...]}` collection envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ValueList<V> {
    pub value: Vec<V>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NamedEntry {
    pub name: String,
}

pub struct ObjectService<'a, T: Transport> {
    rest: &'a RestService<T>,
}

impl<'a, T: Transport> ObjectService<'a, T> {
    pub fn new(rest: &'a RestService<T>) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &'a RestService<T> {
        self.rest
    }

    pub fn version(&self) -> Option<&'a str> {
        self.rest.version()
    }

    /// True if `url` resolves. Only a 404 means absent; other failures propagate.
    pub fn exists(&self, url: &str) -> Result<bool> {
        match self.rest.get(url) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Server spelling of an object name given in any case or spacing.
    ///
    /// `object_class` is the collection, e.g. `Cubes` or `Dimensions`.
    pub fn determine_actual_object_name(&self, object_class: &str, object_name: &str) -> Result<String> {
        let url = format_url(
            "/api/v1/{}?$filter=tolower(replace(Name, ' ', '')) eq '{}'",
            &[object_class, lower_and_drop_spaces(object_name).as_str()],
        );
        let response: ValueList<NamedEntry> = self.rest.get(&url)?.json()?;
        response
            .value
            .into_iter()
            .next()
            .map(|entry| entry.name)
            .ok_or_else(|| ClientError::ObjectNotFound {
                object_type: object_class.to_string(),
                name: object_name.to_string(),
            })
    }
}
