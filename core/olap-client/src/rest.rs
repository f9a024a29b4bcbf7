//! FILENAME: core/olap-client/src/rest.rs
//! PURPOSE: Low-level HTTP communication with the OLAP server.
//! CONTEXT: `RestService` owns the session: base URL, default headers, login
//! and logout. The wire itself sits behind the `Transport` trait so the
//! services above can be driven by an in-memory transport in tests.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::logging::{log_debug, log_info, log_warn};
use crate::url::encode_path;

pub const PRODUCT_VERSION_URL: &str = "/api/v1/Configuration/ProductVersion/$value";
pub const SERVER_NAME_URL: &str = "/api/v1/Configuration/ServerName/$value";
pub const SESSION_CLOSE_URL: &str = "/api/v1/ActiveSession/tm1.Close";
pub const LEGACY_LOGOUT_URL: &str = "/api/logout";
pub const SESSION_COOKIE: &str = "TM1SessionId";

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,

    /// Absolute, path-encoded URL.
    pub url: String,

    pub headers: IndexMap<String, String>,

    /// UTF-8 body; empty for bodiless requests.
    pub body: String,

    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,

    /// Response headers in arrival order. Names may repeat (`Set-Cookie`).
    pub headers: Vec<(String, String)>,

    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: String::new(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Informational, success and redirect codes count as ok.
    pub fn is_ok(&self) -> bool {
        self.status < 400
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<D: DeserializeOwned>(&self) -> Result<D> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("set-cookie"))
            .find_map(|(_, value)| {
                let pair = value.split(';').next()?.trim();
                let (key, cookie_value) = pair.split_once('=')?;
                (key.trim() == name).then_some(cookie_value.trim())
            })
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Executes a single HTTP exchange.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking `reqwest` client with a cookie store, so the session cookie the
/// server issues on login is replayed on every later request.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(config.timeout());
        if let Some(pool_size) = config.connection_pool_size {
            builder = builder.pool_max_idle_per_host(pool_size);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let timeout_error = |e: reqwest::Error| {
            if e.is_timeout() {
                ClientError::Timeout {
                    method: request.method.to_string(),
                    url: request.url.clone(),
                    timeout: request.timeout,
                }
            } else {
                ClientError::Transport(e)
            }
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(timeout_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().map_err(timeout_error)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

// ============================================================================
// REST SERVICE
// ============================================================================

fn default_headers(session_context: &str) -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    headers.insert("Connection".to_string(), "keep-alive".to_string());
    headers.insert(
        "User-Agent".to_string(),
        concat!("olap-client/", env!("CARGO_PKG_VERSION")).to_string(),
    );
    headers.insert(
        "Content-Type".to_string(),
        "application/json; odata.streaming=true; charset=utf-8".to_string(),
    );
    headers.insert(
        "Accept".to_string(),
        "application/json;odata.metadata=none,text/plain".to_string(),
    );
    headers.insert("TM1-SessionContext".to_string(), session_context.to_string());
    headers
}

/// Fails with `ClientError::Http` unless the status is ok.
pub fn verify_response(response: &HttpResponse) -> Result<()> {
    if response.is_ok() {
        return Ok(());
    }
    Err(ClientError::Http {
        status: response.status,
        reason: response.reason.clone(),
        body: response.body.clone(),
    })
}

pub struct RestService<T: Transport = ReqwestTransport> {
    transport: T,
    base_url: String,
    headers: IndexMap<String, String>,
    timeout: Option<Duration>,
    version: Option<String>,
    session_id: Option<String>,
}

impl RestService<ReqwestTransport> {
    /// Opens a session over HTTP using the given settings.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(transport, config)
    }
}

impl<T: Transport> RestService<T> {
    /// Opens a session over `transport`.
    ///
    /// With a `session_id` the existing session is reused; otherwise the user
    /// logs in with native Basic credentials.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self> {
        let mut headers = default_headers(&config.session_context);
        for (name, value) in &config.headers {
            headers.insert(name.clone(), value.clone());
        }
        let mut service = Self {
            transport,
            base_url: config.base_url()?,
            headers,
            timeout: config.timeout(),
            version: None,
            session_id: None,
        };

        if let Some(session_id) = &config.session_id {
            service.add_http_header("Cookie", format!("{}={}", SESSION_COOKIE, session_id));
            service.session_id = Some(session_id.clone());
            service.set_version()?;
        } else if let Some(user) = &config.user {
            let password = config.password()?.unwrap_or_default();
            service.start_session(user, &password)?;
        } else {
            return Err(ClientError::Config(
                "either session_id or user must be set".to_string(),
            ));
        }
        log_info!(
            "REST",
            "Connected to {} (version {})",
            service.base_url,
            service.version.as_deref().unwrap_or("unknown")
        );
        Ok(service)
    }

    fn start_session(&mut self, user: &str, password: &str) -> Result<()> {
        let token = STANDARD.encode(format!("{}:{}", user, password));
        self.add_http_header("Authorization", format!("Basic {}", token));
        let response = self.get(PRODUCT_VERSION_URL);
        // The session cookie carries authentication from here on.
        self.remove_http_header("Authorization");
        let response = response?;
        self.session_id = response.cookie(SESSION_COOKIE).map(str::to_string);
        self.version = Some(response.body);
        Ok(())
    }

    pub fn set_version(&mut self) -> Result<()> {
        let response = self.get(PRODUCT_VERSION_URL)?;
        self.version = Some(response.body);
        Ok(())
    }

    // ========================================================================
    // HTTP METHODS
    // ========================================================================

    /// Sends a request relative to the base URL and verifies the response.
    pub fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: &str,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        let full_url = encode_path(&format!("{}{}", self.base_url, url));
        log_debug!("REST", "{} {}", method, full_url);
        let request = HttpRequest {
            method,
            url: full_url,
            headers: self.headers.clone(),
            body: body.to_string(),
            timeout: timeout.or(self.timeout),
        };
        let response = self.transport.execute(request)?;
        if let Err(e) = verify_response(&response) {
            log_warn!("REST", "{} {} failed: {}", method, url, e);
            return Err(e);
        }
        Ok(response)
    }

    pub fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpMethod::Get, url, "", None)
    }

    pub fn post(&self, url: &str, body: &str) -> Result<HttpResponse> {
        self.request(HttpMethod::Post, url, body, None)
    }

    pub fn patch(&self, url: &str, body: &str) -> Result<HttpResponse> {
        self.request(HttpMethod::Patch, url, body, None)
    }

    pub fn put(&self, url: &str, body: &str) -> Result<HttpResponse> {
        self.request(HttpMethod::Put, url, body, None)
    }

    pub fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpMethod::Delete, url, "", None)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// True if the server answers an authenticated request.
    pub fn is_connected(&self) -> bool {
        self.get(SERVER_NAME_URL).is_ok()
    }

    /// Closes the session, falling back to the legacy logout endpoint.
    pub fn logout(&mut self) -> Result<()> {
        self.add_http_header("Connection", "close");
        match self.post(SESSION_CLOSE_URL, "") {
            Ok(_) => Ok(()),
            Err(e) => {
                log_warn!("REST", "Closing session failed ({}), trying {}", e, LEGACY_LOGOUT_URL);
                self.post(LEGACY_LOGOUT_URL, "").map(|_| ())
            }
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ========================================================================
    // HEADERS
    // ========================================================================

    pub fn get_http_header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn add_http_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn remove_http_header(&mut self, key: &str) -> Option<String> {
        self.headers.shift_remove(key)
    }
}
