//! FILENAME: core/olap-client/src/config.rs
//! PURPOSE: Connection settings for an OLAP REST server.
//! CONTEXT: Settings are plain serde data so they can live in a JSON file
//! next to the application. Any missing field takes its default.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const DEFAULT_SESSION_CONTEXT: &str = "olap-client";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full service root such as `https://server:8010`. Wins over address/port/ssl.
    pub base_url: Option<String>,

    /// Host name; `localhost` when absent.
    pub address: Option<String>,

    /// HTTP port of the server.
    pub port: Option<u16>,

    pub ssl: bool,

    pub user: Option<String>,

    pub password: Option<String>,

    /// Password is stored base64 encoded.
    pub decode_b64: bool,

    /// Reuse an existing session instead of logging in.
    pub session_id: Option<String>,

    /// Sent as `TM1-SessionContext`; shows up in the server's thread monitor.
    pub session_context: String,

    /// Verify the server's TLS certificate.
    pub verify_ssl: bool,

    /// Per-request timeout in seconds. No timeout when absent.
    pub timeout_secs: Option<f64>,

    /// Maximum idle connections kept per host.
    pub connection_pool_size: Option<usize>,

    /// Extra headers sent with every request.
    pub headers: IndexMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            address: None,
            port: None,
            ssl: true,
            user: None,
            password: None,
            decode_b64: false,
            session_id: None,
            session_context: DEFAULT_SESSION_CONTEXT.to_string(),
            verify_ssl: false,
            timeout_secs: None,
            connection_pool_size: None,
            headers: IndexMap::new(),
        }
    }
}

impl ClientConfig {
    /// Service root without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        if let Some(base_url) = &self.base_url {
            return Ok(base_url.trim_end_matches('/').to_string());
        }
        let port = self
            .port
            .ok_or_else(|| ClientError::Config("either base_url or port must be set".to_string()))?;
        let address = match self.address.as_deref() {
            Some(address) if !address.is_empty() => address,
            _ => "localhost",
        };
        let scheme = if self.ssl { "https" } else { "http" };
        Ok(format!("{}://{}:{}", scheme, address, port))
    }

    /// Clear-text password, decoded when `decode_b64` is set.
    pub fn password(&self) -> Result<Option<String>> {
        let Some(password) = &self.password else {
            return Ok(None);
        };
        if !self.decode_b64 {
            return Ok(Some(password.clone()));
        }
        let bytes = STANDARD
            .decode(password)
            .map_err(|e| ClientError::Config(format!("password is not valid base64: {}", e)))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| ClientError::Config(format!("decoded password is not UTF-8: {}", e)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

// ============================================================================
// FILE IO
// ============================================================================

/// Loads settings from a JSON file. A missing file yields the defaults.
pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    log::info!(target: "CONFIG", "Loading client config from {:?}", path);
    match fs::read_to_string(path) {
        Ok(text) => {
            let config = serde_json::from_str(&text).map_err(|e| {
                log::error!(target: "CONFIG", "Failed to parse config file {:?}: {}", path, e);
                e
            })?;
            Ok(config)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!(target: "CONFIG", "Config file {:?} not found, using defaults", path);
            Ok(ClientConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn save_config_to_file(config: &ClientConfig, path: impl AsRef<Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_from_address_and_port() {
        let config = ClientConfig {
            address: Some("olap01".to_string()),
            port: Some(8010),
            ..Default::default()
        };
        assert_eq!(config.base_url().unwrap(), "https://olap01:8010");
    }

    #[test]
    fn test_base_url_defaults_to_localhost_without_ssl() {
        let config = ClientConfig {
            port: Some(12354),
            ssl: false,
            ..Default::default()
        };
        assert_eq!(config.base_url().unwrap(), "http://localhost:12354");
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = ClientConfig {
            base_url: Some("https://cloud.example.com/tm1/api/planning/".to_string()),
            port: Some(1),
            ..Default::default()
        };
        assert_eq!(
            config.base_url().unwrap(),
            "https://cloud.example.com/tm1/api/planning"
        );
    }

    #[test]
    fn test_missing_port_is_config_error() {
        let err = ClientConfig::default().base_url().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_password_decoding() {
        let config = ClientConfig {
            password: Some("YXBwbGU=".to_string()),
            decode_b64: true,
            ..Default::default()
        };
        assert_eq!(config.password().unwrap().as_deref(), Some("apple"));

        let plain = ClientConfig {
            password: Some("YXBwbGU=".to_string()),
            ..Default::default()
        };
        assert_eq!(plain.password().unwrap().as_deref(), Some("YXBwbGU="));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"port": 8001, "user": "admin"}"#).unwrap();
        assert_eq!(config.port, Some(8001));
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert!(config.ssl);
        assert_eq!(config.session_context, DEFAULT_SESSION_CONTEXT);
    }

    #[test]
    fn test_timeout_ignores_non_positive() {
        let mut config = ClientConfig::default();
        assert_eq!(config.timeout(), None);
        config.timeout_secs = Some(0.0);
        assert_eq!(config.timeout(), None);
        config.timeout_secs = Some(1.5);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }
}
