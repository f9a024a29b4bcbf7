//! FILENAME: tests/common/mod.rs
// PURPOSE: Shared test utilities for olap-client integration tests.
// CONTEXT: Provides an in-memory transport that records every request and
// answers from canned routes, plus cellset fixtures for a small Sales cube.

#![allow(dead_code)]

use std::cell::RefCell;

use olap_client::{ClientConfig, HttpMethod, HttpRequest, HttpResponse, OlapService, Transport};
use serde_json::{json, Value};

pub const VERSION: &str = "11.8.02100.3";
pub const SESSION_ID: &str = "s3ss10n";
pub const CELLSET_ID: &str = "cs-1";

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

struct Route {
    method: HttpMethod,
    url_contains: String,
    response: HttpResponse,
}

/// Answers requests from routes; the most recently added matching route wins.
/// Unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: RefCell<Vec<Route>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: HttpMethod, url_contains: &str, response: HttpResponse) {
        self.routes.borrow_mut().push(Route {
            method,
            url_contains: url_contains.to_string(),
            response,
        });
    }

    pub fn respond_json(&self, method: HttpMethod, url_contains: &str, body: Value) {
        self.respond(method, url_contains, HttpResponse::new(200, body.to_string()));
    }

    pub fn respond_text(&self, method: HttpMethod, url_contains: &str, body: &str) {
        self.respond(method, url_contains, HttpResponse::new(200, body));
    }

    pub fn fail(&self, method: HttpMethod, url_contains: &str, status: u16, body: &str) {
        let mut response = HttpResponse::new(status, body);
        response.reason = "Server Error".to_string();
        self.respond(method, url_contains, response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_with(&self, method: HttpMethod, url_contains: &str) -> Vec<HttpRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url.contains(url_contains))
            .cloned()
            .collect()
    }

    pub fn count(&self, method: HttpMethod, url_contains: &str) -> usize {
        self.requests_with(method, url_contains).len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.borrow().last().cloned()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> olap_client::Result<HttpResponse> {
        let response = self
            .routes
            .borrow()
            .iter()
            .rev()
            .find(|route| route.method == request.method && request.url.contains(&route.url_contains))
            .map(|route| route.response.clone())
            .unwrap_or_else(|| HttpResponse::new(404, format!("no route for {}", request.url)));
        self.requests.borrow_mut().push(request);
        Ok(response)
    }
}

// ============================================================================
// TEST HARNESS
// ============================================================================

pub struct TestHarness {
    pub olap: OlapService<MockTransport>,
}

impl TestHarness {
    /// Logged in as `admin` against `http://localhost:8010`.
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn config() -> ClientConfig {
        ClientConfig {
            address: Some("localhost".to_string()),
            port: Some(8010),
            ssl: false,
            user: Some("admin".to_string()),
            password: Some("apple".to_string()),
            ..Default::default()
        }
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = login_transport();
        let olap = OlapService::with_transport(transport, &config).expect("login against mock");
        olap.connection().transport().clear_requests();
        Self { olap }
    }

    /// Harness whose server knows the Sales cube and its cellsets.
    pub fn with_sales_cube() -> Self {
        let harness = Self::new();
        SalesFixture::install(harness.transport());
        harness
    }

    pub fn transport(&self) -> &MockTransport {
        self.olap.connection().transport()
    }
}

pub fn login_transport() -> MockTransport {
    let transport = MockTransport::new();
    let mut version = HttpResponse::new(200, VERSION);
    version.headers.push((
        "Set-Cookie".to_string(),
        format!("TM1SessionId={}; Path=/api/; HttpOnly", SESSION_ID),
    ));
    transport.respond(HttpMethod::Get, "/Configuration/ProductVersion/$value", version);
    transport
}

// ============================================================================
// SALES FIXTURE
// ============================================================================

/// Cube `Sales` with dimensions Year, Region, Measure (in that order).
///
/// The query places Measure on axis 0 (Revenue, Cost), Region on axis 1
/// (North, South, West) and the single Year 2024 on the title axis.
pub struct SalesFixture;

impl SalesFixture {
    pub const CUBE: &'static str = "Sales";
    pub const MDX: &'static str = "SELECT {[Measure].[Revenue],[Measure].[Cost]} ON 0, \
                                   {[Region].[North],[Region].[South],[Region].[West]} ON 1 \
                                   FROM [Sales] WHERE ([Year].[2024])";

    pub fn dimensions() -> Vec<String> {
        vec!["Year".to_string(), "Region".to_string(), "Measure".to_string()]
    }

    pub fn measures() -> Vec<&'static str> {
        vec!["Revenue", "Cost"]
    }

    pub fn regions() -> Vec<&'static str> {
        vec!["North", "South", "West"]
    }

    /// Values in ordinal order: Revenue/Cost for North, South, West.
    pub fn values() -> Vec<Value> {
        vec![
            json!(100.126),
            json!(60.0),
            json!(200.5),
            Value::Null,
            json!(300.0),
            json!(180.25),
        ]
    }

    fn member(dimension: &str, element: &str) -> Value {
        let unique_name = format!("[{}].[{}].[{}]", dimension, dimension, element);
        json!({
            "Name": element,
            "UniqueName": unique_name,
            "Element": { "Name": element, "UniqueName": unique_name },
        })
    }

    fn axis(dimension: &str, elements: &[&str]) -> Value {
        let tuples: Vec<Value> = elements
            .iter()
            .map(|e| json!({ "Members": [Self::member(dimension, e)] }))
            .collect();
        json!({ "Cardinality": elements.len(), "Tuples": tuples })
    }

    pub fn cellset() -> Value {
        let cells: Vec<Value> = Self::values()
            .into_iter()
            .enumerate()
            .map(|(ordinal, value)| json!({ "Ordinal": ordinal, "Value": value }))
            .collect();
        json!({
            "ID": CELLSET_ID,
            "Cube": {
                "Name": Self::CUBE,
                "Dimensions": [{ "Name": "Year" }, { "Name": "Region" }, { "Name": "Measure" }],
            },
            "Axes": [
                Self::axis("Measure", &Self::measures()),
                Self::axis("Region", &Self::regions()),
                Self::axis("Year", &["2024"]),
            ],
            "Cells": cells,
        })
    }

    /// Shape of `Axes($filter=Ordinal eq 1 ...)`: only the row axis.
    pub fn rows_and_values(element_property: &str) -> Value {
        let tuples: Vec<Value> = Self::regions()
            .iter()
            .map(|region| {
                let element = if element_property == "Name" {
                    json!({ "Name": region })
                } else {
                    json!({ "UniqueName": format!("[Region].[Region].[{}]", region) })
                };
                json!({ "Members": [{ "Element": element }] })
            })
            .collect();
        let cells: Vec<Value> = Self::values().into_iter().map(|v| json!({ "Value": v })).collect();
        json!({ "ID": CELLSET_ID, "Axes": [{ "Tuples": tuples }], "Cells": cells })
    }

    /// Shape of `Axes($filter=Ordinal eq 0 or Ordinal eq 1 ...)` with member
    /// and hierarchy names only.
    pub fn power_bi() -> Value {
        let named_axis = |ordinal: usize, hierarchy: &str, elements: &[&str]| {
            let tuples: Vec<Value> = elements
                .iter()
                .map(|e| json!({ "Members": [{ "Name": e }] }))
                .collect();
            json!({
                "Ordinal": ordinal,
                "Cardinality": elements.len(),
                "Hierarchies": [{ "Name": hierarchy }],
                "Tuples": tuples,
            })
        };
        let cells: Vec<Value> = Self::values().into_iter().map(|v| json!({ "Value": v })).collect();
        json!({
            "ID": CELLSET_ID,
            "Axes": [
                named_axis(0, "Measure", &Self::measures()),
                named_axis(1, "Region", &Self::regions()),
            ],
            "Cells": cells,
        })
    }

    pub fn values_only() -> Value {
        let cells: Vec<Value> = Self::values().into_iter().map(|v| json!({ "Value": v })).collect();
        json!({ "ID": CELLSET_ID, "Cells": cells })
    }

    pub fn composition() -> Value {
        json!({
            "ID": CELLSET_ID,
            "Cube": { "Name": Self::CUBE },
            "Axes": [
                { "Hierarchies": [{ "UniqueName": "[Measure].[Measure]" }] },
                { "Hierarchies": [{ "UniqueName": "[Region].[Region]" }] },
                { "Hierarchies": [{ "UniqueName": "[Year].[Year]" }] },
            ],
        })
    }

    pub fn csv() -> &'static str {
        "Region,Measure,Value\r\nNorth,Revenue,100.126\r\nNorth,Cost,60\r\nSouth,Revenue,200.5\r\nWest,Revenue,300\r\nWest,Cost,180.25\r\n"
    }

    pub fn cube() -> Value {
        json!({
            "Name": Self::CUBE,
            "Dimensions": [{ "Name": "Year" }, { "Name": "Region" }, { "Name": "Measure" }],
            "Rules": "SKIPCHECK;",
        })
    }

    /// Registers routes for every cellset request the services issue.
    /// More specific routes are added last so they win.
    pub fn install(transport: &MockTransport) {
        transport.respond_json(HttpMethod::Post, "/ExecuteMDX", json!({ "ID": CELLSET_ID }));
        transport.respond_json(HttpMethod::Post, "/tm1.Execute", json!({ "ID": CELLSET_ID }));
        transport.respond(HttpMethod::Delete, "/Cellsets(", HttpResponse::new(204, ""));

        transport.respond_json(HttpMethod::Get, "/Cellsets(", Self::cellset());
        transport.respond_json(HttpMethod::Get, "?$expand=Cells(", Self::values_only());
        transport.respond_json(HttpMethod::Get, "Axes($expand=Hierarchies", Self::composition());
        transport.respond_json(
            HttpMethod::Get,
            "Members($select=Element;$expand=Element($select=UniqueName)",
            Self::rows_and_values("UniqueName"),
        );
        transport.respond_json(
            HttpMethod::Get,
            "Members($select=Element;$expand=Element($select=Name)",
            Self::rows_and_values("Name"),
        );
        transport.respond_json(HttpMethod::Get, "Hierarchies($select=Name)", Self::power_bi());
        transport.respond_text(HttpMethod::Get, "/Cells/$count", "6");
        transport.respond_text(HttpMethod::Get, "/Content", Self::csv());

        transport.respond_json(HttpMethod::Get, "/Cubes('Sales')?$expand=Dimensions", Self::cube());
        transport.respond_json(
            HttpMethod::Get,
            "/Cubes('Sales')/Dimensions?$select=Name",
            json!({ "value": [{ "Name": "Year" }, { "Name": "Region" }, { "Name": "Measure" }] }),
        );
    }
}
