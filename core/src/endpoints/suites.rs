//! Test suites (read-only in this client).

use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::ResourceId;

impl<T: Transport> TestRailClient<T> {
    pub fn get_suite(&self, suite_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_suite/{suite_id}"))
    }

    pub fn get_suites(&self, project_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_suites/{project_id}"))
    }
}
