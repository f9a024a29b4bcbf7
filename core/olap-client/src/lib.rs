//! FILENAME: core/olap-client/src/lib.rs
//! Blocking REST client for OLAP cubes.
//!
//! Layers:
//! - `config`: Connection settings and their JSON file
//! - `rest`: HTTP transport, session handling and request verification
//! - `url`: OData URL quoting
//! - `object_service`, `cube_service`: Metadata services
//! - `cell_service`: Cellset execution, extraction and write-back
//! - `logging`: Category-tagged log macros
//!
//! ```no_run
//! use olap_client::{ClientConfig, CellsetQuery, OlapService, QuerySource};
//!
//! let config = ClientConfig {
//!     address: Some("localhost".to_string()),
//!     port: Some(8010),
//!     user: Some("admin".to_string()),
//!     password: Some("apple".to_string()),
//!     ..Default::default()
//! };
//! let mut olap = OlapService::connect(&config)?;
//! let mdx = "SELECT {[Period].[Q1]} ON 0, {[Account].[Revenue]} ON 1 FROM [Sales]";
//! let values = olap.cells().execute(&QuerySource::mdx(mdx), &CellsetQuery::default())?;
//! for (coordinates, value) in &values {
//!     println!("{:?} = {}", coordinates, value);
//! }
//! olap.logout()?;
//! # Ok::<(), olap_client::ClientError>(())
//! ```

pub mod cell_service;
pub mod config;
pub mod cube_service;
pub mod error;
pub mod logging;
pub mod object_service;
pub mod rest;
pub mod url;

pub use cell_service::{CellService, CellsetQuery, QuerySource, DEFAULT_VALUE_PRECISION};
pub use config::{load_config_from_file, save_config_to_file, ClientConfig};
pub use cube_service::{Cube, CubeService};
pub use error::{ClientError, Result};
pub use object_service::ObjectService;
pub use rest::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, RestService, Transport};

// ============================================================================
// SERVICE FACADE
// ============================================================================

/// Entry point owning the session. Services borrow it.
pub struct OlapService<T: Transport = ReqwestTransport> {
    rest: RestService<T>,
}

impl OlapService<ReqwestTransport> {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestService::connect(config)?,
        })
    }
}

impl<T: Transport> OlapService<T> {
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestService::with_transport(transport, config)?,
        })
    }

    pub fn cells(&self) -> CellService<'_, T> {
        CellService::new(&self.rest)
    }

    pub fn cubes(&self) -> CubeService<'_, T> {
        CubeService::new(&self.rest)
    }

    /// The underlying REST service, for requests no service covers.
    pub fn connection(&self) -> &RestService<T> {
        &self.rest
    }

    pub fn connection_mut(&mut self) -> &mut RestService<T> {
        &mut self.rest
    }

    pub fn version(&self) -> Option<&str> {
        self.rest.version()
    }

    pub fn logout(&mut self) -> Result<()> {
        self.rest.logout()
    }
}
