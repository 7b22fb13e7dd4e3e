//! # Design
//!
//! - One error type for every remote call, with the operation recorded in a field.
//! - HTTP status failures keep the response body so operators can see the service's reason.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for remote API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced by the remote API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured API root is not a usable base URL.
    #[error("invalid api root")]
    InvalidRoot {
        /// Configured value.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Building the underlying HTTP client failed.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The replay could not be read from disk at submission time.
    #[error("failed to read replay file")]
    ReadReplay {
        /// Replay path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Transport-level failure talking to the service.
    #[error("request to remote service failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Request URL.
        url: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("remote service rejected request with status {status}")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, trimmed.
        body: String,
    },
    /// The response body was not the expected JSON document.
    #[error("remote service returned an undecodable response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A required field was absent from an otherwise valid response.
    #[error("remote service response missing field")]
    MissingField {
        /// Operation identifier.
        operation: &'static str,
        /// Missing field name.
        field: &'static str,
    },
}

impl ApiError {
    pub(crate) fn http(
        operation: &'static str,
        url: impl Into<String>,
        source: reqwest::Error,
    ) -> Self {
        Self::Http {
            operation,
            url: url.into(),
            source,
        }
    }
}
