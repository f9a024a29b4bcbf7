//! FILENAME: core/olap-client/src/error.rs

use std::time::Duration;

use cellset_engine::CellsetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed with status {status} {reason}: {body}")]
    Http { status: u16, reason: String, body: String },

    #[error("{method} request to {url} timed out after {timeout:?}")]
    Timeout {
        method: String,
        url: String,
        timeout: Option<Duration>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cellset(#[from] CellsetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{object_type} '{name}' does not exist")]
    ObjectNotFound { object_type: String, name: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// HTTP status of a rejected request, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_exposes_status() {
        let err = ClientError::Http {
            status: 404,
            reason: "Not Found".to_string(),
            body: String::new(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[test]
    fn test_cellset_error_is_transparent() {
        let err: ClientError = CellsetError::EmptyCellset.into();
        assert_eq!(err.to_string(), CellsetError::EmptyCellset.to_string());
        assert_eq!(err.status(), None);
    }
}
