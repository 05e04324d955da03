//! Test results. The remote API offers no update or delete for results.

use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    /// Get all results recorded for a test.
    pub fn get_results(&self, test_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_results/{test_id}"))
    }

    /// Record a new result (status, comment, elapsed, ...) for a test.
    pub fn add_result(&self, test_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("add_result/{test_id}"), Some(data))
    }
}
