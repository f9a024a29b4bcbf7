//! FILENAME: tests/test_config.rs
// PURPOSE: Loading and saving client settings on disk.

use olap_client::{load_config_from_file, save_config_to_file, ClientConfig, ClientError};
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from_file(dir.path().join("absent.json")).unwrap();
    assert_eq!(config, ClientConfig::default());
}

#[test]
fn test_save_then_load_keeps_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("olap.json");

    let mut config = ClientConfig {
        address: Some("olap01".to_string()),
        port: Some(8010),
        user: Some("admin".to_string()),
        password: Some("YXBwbGU=".to_string()),
        decode_b64: true,
        timeout_secs: Some(30.0),
        ..Default::default()
    };
    config.headers.insert("X-Team".to_string(), "finance".to_string());

    save_config_to_file(&config, &path).unwrap();
    let loaded = load_config_from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.password().unwrap().as_deref(), Some("apple"));
    assert_eq!(loaded.base_url().unwrap(), "https://olap01:8010");
}

#[test]
fn test_hand_written_file_fills_gaps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("olap.json");
    std::fs::write(&path, r#"{ "base_url": "http://olap01:5000/", "session_id": "xyz" }"#).unwrap();

    let config = load_config_from_file(&path).unwrap();
    assert_eq!(config.base_url().unwrap(), "http://olap01:5000");
    assert_eq!(config.session_id.as_deref(), Some("xyz"));
    assert!(config.user.is_none());
}

#[test]
fn test_invalid_json_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("olap.json");
    std::fs::write(&path, "{ port: ").unwrap();

    let err = load_config_from_file(&path).unwrap_err();
    assert!(matches!(err, ClientError::Json(_)));
}
