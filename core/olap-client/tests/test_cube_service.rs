//! FILENAME: tests/test_cube_service.rs
// PURPOSE: Cube reads, writes and lookups against the mock server.

mod common;

use common::{SalesFixture, TestHarness};
use olap_client::{ClientError, Cube, HttpMethod, HttpResponse};
use serde_json::{json, Value};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn named(names: &[&str]) -> Value {
    let entries: Vec<Value> = names.iter().map(|n| json!({ "Name": n })).collect();
    json!({ "value": entries })
}

fn last_body(harness: &TestHarness) -> Value {
    let request = harness.transport().last_request().expect("request was sent");
    serde_json::from_str(&request.body).expect("body is JSON")
}

// ============================================================================
// READS
// ============================================================================

#[test]
fn test_get_cube() {
    let harness = TestHarness::with_sales_cube();
    let cube = harness.olap.cubes().get("Sales").unwrap();
    assert_eq!(cube.name, "Sales");
    assert_eq!(cube.dimensions, SalesFixture::dimensions());
    assert!(cube.has_rules());
}

#[test]
fn test_get_all_and_names() {
    let harness = TestHarness::new();
    harness.transport().respond_json(
        HttpMethod::Get,
        "/api/v1/Cubes?$expand",
        json!({ "value": [SalesFixture::cube(), { "Name": "Plan", "Dimensions": [{ "Name": "Version" }] }] }),
    );
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/api/v1/Cubes?$select=Name", named(&["Sales", "Plan"]));

    let cubes = harness.olap.cubes().get_all().unwrap();
    assert_eq!(cubes.len(), 2);
    assert_eq!(cubes[1].dimensions, vec!["Version"]);
    assert!(!cubes[1].has_rules());

    assert_eq!(harness.olap.cubes().get_all_names().unwrap(), vec!["Sales", "Plan"]);
}

#[test]
fn test_model_and_control_cubes_use_their_collections() {
    let harness = TestHarness::new();
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/ModelCubes()", json!({ "value": [SalesFixture::cube()] }));
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/ControlCubes()", json!({ "value": [] }));

    assert_eq!(harness.olap.cubes().get_model_cubes().unwrap().len(), 1);
    assert!(harness.olap.cubes().get_control_cubes().unwrap().is_empty());
}

#[test]
fn test_dimension_names_skip_sandbox() {
    let harness = TestHarness::new();
    harness.transport().respond_json(
        HttpMethod::Get,
        "/Cubes('Sales')/Dimensions",
        named(&["Sandboxes", "Year", "Region"]),
    );

    let cubes = harness.olap.cubes();
    assert_eq!(cubes.get_dimension_names("Sales", true).unwrap(), vec!["Year", "Region"]);
    assert_eq!(
        cubes.get_dimension_names("Sales", false).unwrap(),
        vec!["Sandboxes", "Year", "Region"]
    );
}

#[test]
fn test_exists_only_treats_404_as_absent() {
    let harness = TestHarness::new();
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/Cubes('Sales')", SalesFixture::cube());
    harness
        .transport()
        .fail(HttpMethod::Get, "/Cubes('Broken')", 500, "internal");

    let cubes = harness.olap.cubes();
    assert!(cubes.exists("Sales").unwrap());
    assert!(!cubes.exists("Missing").unwrap());
    assert_eq!(cubes.exists("Broken").unwrap_err().status(), Some(500));
}

#[test]
fn test_determine_actual_name() {
    let harness = TestHarness::new();
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/Cubes?$filter=", named(&["Sales Plan"]));

    assert_eq!(harness.olap.cubes().determine_actual_name("salesplan").unwrap(), "Sales Plan");
    let request = harness.transport().last_request().unwrap();
    assert!(request.url.contains("eq%20'salesplan'"));

    harness
        .transport()
        .respond_json(HttpMethod::Get, "/Cubes?$filter=", named(&[]));
    let err = harness.olap.cubes().determine_actual_name("Nope").unwrap_err();
    assert!(matches!(err, ClientError::ObjectNotFound { .. }));
}

#[test]
fn test_last_data_update() {
    let harness = TestHarness::new();
    harness
        .transport()
        .respond_text(HttpMethod::Get, "/LastDataUpdate/$value", "2026-03-01T10:00:00Z");
    assert_eq!(
        harness.olap.cubes().get_last_data_update("Sales").unwrap(),
        "2026-03-01T10:00:00Z"
    );
}

// ============================================================================
// WRITES
// ============================================================================

#[test]
fn test_update_or_create_creates_missing_cube() {
    let harness = TestHarness::new();
    harness.transport().respond(HttpMethod::Post, "/api/v1/Cubes", HttpResponse::new(201, ""));

    let cube = Cube::new("Plan", vec!["Version".to_string(), "Year".to_string()]).with_rules("SKIPCHECK;");
    harness.olap.cubes().update_or_create(&cube).unwrap();

    let request = harness.transport().last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(
        last_body(&harness),
        json!({
            "Name": "Plan",
            "Dimensions@odata.bind": ["Dimensions('Version')", "Dimensions('Year')"],
            "Rules": "SKIPCHECK;"
        })
    );
}

#[test]
fn test_update_or_create_patches_existing_cube() {
    let harness = TestHarness::with_sales_cube();
    harness
        .transport()
        .respond_json(HttpMethod::Get, "/Cubes('Sales')", SalesFixture::cube());
    harness
        .transport()
        .respond(HttpMethod::Patch, "/Cubes('Sales')", HttpResponse::new(204, ""));

    let cube = Cube::new("Sales", SalesFixture::dimensions());
    harness.olap.cubes().update_or_create(&cube).unwrap();
    assert_eq!(harness.transport().count(HttpMethod::Patch, "/Cubes('Sales')"), 1);
    assert_eq!(harness.transport().count(HttpMethod::Post, "/Cubes"), 0);
}

#[test]
fn test_storage_dimension_order() {
    let harness = TestHarness::new();
    harness.transport().respond_json(
        HttpMethod::Get,
        "/tm1.DimensionsStorageOrder()",
        named(&["Measure", "Year", "Region"]),
    );
    harness
        .transport()
        .respond(HttpMethod::Post, "/tm1.ReorderDimensions", HttpResponse::new(204, ""));

    let cubes = harness.olap.cubes();
    assert_eq!(
        cubes.get_storage_dimension_order("Sales").unwrap(),
        vec!["Measure", "Year", "Region"]
    );
    cubes.update_storage_dimension_order("Sales", &["Year", "Region", "Measure"]).unwrap();
    assert_eq!(
        last_body(&harness),
        json!({ "Dimensions@odata.bind": [
            "Dimensions('Year')", "Dimensions('Region')", "Dimensions('Measure')"
        ]})
    );
}

#[test]
fn test_check_rules() {
    let harness = TestHarness::new();
    harness
        .transport()
        .respond(HttpMethod::Post, "/Cubes('Sales')/tm1.CheckRules", HttpResponse::new(200, ""));
    assert!(harness.olap.cubes().check_rules("Sales").unwrap().is_empty());

    harness.transport().respond_json(
        HttpMethod::Post,
        "/Cubes('Sales')/tm1.CheckRules",
        json!({ "value": [{ "LineNumber": 3, "Message": "Syntax error" }] }),
    );
    let errors = harness.olap.cubes().check_rules("Sales").unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["LineNumber"], 3);
}

#[test]
fn test_load_unload_delete() {
    let harness = TestHarness::new();
    let transport = harness.transport();
    transport.respond(HttpMethod::Post, "/tm1.Load", HttpResponse::new(204, ""));
    transport.respond(HttpMethod::Post, "/tm1.Unload", HttpResponse::new(204, ""));
    transport.respond(HttpMethod::Delete, "/Cubes('Old')", HttpResponse::new(204, ""));

    let cubes = harness.olap.cubes();
    cubes.load("Sales").unwrap();
    cubes.unload("Sales").unwrap();
    cubes.delete("Old").unwrap();

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:8010/api/v1/Cubes('Sales')/tm1.Load",
            "http://localhost:8010/api/v1/Cubes('Sales')/tm1.Unload",
            "http://localhost:8010/api/v1/Cubes('Old')",
        ]
    );
}
