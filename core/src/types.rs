//! Payload types shared by the dispatcher and the endpoint wrappers.
//!
//! # Design
//! The client carries no schema of its own. Bodies, query parameters and
//! responses are `serde_json` values passed through verbatim, so whatever
//! fields the remote API accepts or returns reach the caller untouched.

use serde_json::{Map, Value};

/// String-keyed JSON object used for request bodies and query parameters.
pub type JsonObject = Map<String, Value>;

/// Numeric identifier of a remote resource (case, project, run, ...).
pub type ResourceId = u64;
