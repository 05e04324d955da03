//! Error types for the TestRail API client.
//!
//! # Design
//! Every failed round-trip lands in `RemoteRequestFailed`, whether the server
//! answered with a status >= 300 or the transport gave up before any response
//! arrived (`status` is `None` in that case). Callers that care about the
//! difference inspect the status code. `InvalidArgument` is raised before any
//! request is sent.

use thiserror::Error;

/// Errors returned by `TestRailClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A caller-supplied argument cannot be turned into a request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote API rejected the request or could not be reached.
    #[error(
        "TestRail API returned {}: {error} [URL: {url}]{}",
        status_label(.status),
        params_label(.params)
    )]
    RemoteRequestFailed {
        status: Option<u16>,
        /// Decoded JSON error payload, or the raw response text.
        error: String,
        url: String,
        /// Query parameters as supplied by the caller, before null filtering.
        params: Option<String>,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Client configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status carried by a remote failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RemoteRequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

fn params_label(params: &Option<String>) -> String {
    match params {
        Some(params) => format!(" [Original params: {params}]"),
        None => String::new(),
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
