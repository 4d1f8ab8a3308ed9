//! Error types for the HTTP client

use portal_core::ServiceError;
use thiserror::Error;

/// Error type for form service requests
#[derive(Error, Debug)]
pub enum Error {
    /// Service answered with a non-success status
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Option endpoint declared a method the client does not issue
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the service rejected the request (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if (400..500).contains(status))
    }
}

impl From<Error> for ServiceError {
    fn from(err: Error) -> Self {
        match err {
            Error::Api { status, body } => ServiceError::Status { status, body },
            Error::Json(e) => ServiceError::Decode(e.to_string()),
            Error::Http(e) if e.is_decode() => ServiceError::Decode(e.to_string()),
            Error::UnsupportedMethod(method) => ServiceError::UnsupportedMethod(method),
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
