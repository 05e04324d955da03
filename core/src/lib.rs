//! Synchronous client for the TestRail v2 REST API.
//!
//! # Overview
//! `TestRailClient` turns typed method calls into authenticated HTTP requests
//! against `<base>/index.php?/api/v2/`, sends them through a pooled blocking
//! transport and hands back the decoded JSON untouched.
//!
//! # Design
//! - One dispatcher (`send_request`) split into `build_request` and
//!   `parse_response`, so request construction and status handling are
//!   testable without a network.
//! - `Transport` is the only I/O seam; `UreqTransport` is the default.
//! - Payloads are `serde_json` values. The client validates no schema.
//! - Endpoint wrappers live in `endpoints`, one file per resource family.
//!
//! ```no_run
//! use serde_json::json;
//! use testrail_core::TestRailClient;
//!
//! # fn example() -> testrail_core::Result<()> {
//! let client = TestRailClient::new("https://example.testrail.io", "qa@example.com", "api-key");
//! let cases = client.get_cases(3, Some(7))?;
//! let result = json!({"status_id": 1, "comment": "green"});
//! client.add_result(42, result.as_object().unwrap())?;
//! # let _ = cases;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
mod endpoints;
pub mod error;
pub mod http;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::Credentials;
pub use client::{TestRailClient, API_PREFIX};
pub use config::TestRailConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use types::{JsonObject, ResourceId};
