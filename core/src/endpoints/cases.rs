//! Test cases.

use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    /// Get a test case by ID.
    pub fn get_case(&self, case_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_case/{case_id}"))
    }

    /// Get all test cases of a project, optionally narrowed to one suite.
    pub fn get_cases(&self, project_id: ResourceId, suite_id: Option<ResourceId>) -> Result<Value> {
        let mut params = JsonObject::new();
        if let Some(suite_id) = suite_id {
            params.insert("suite_id".to_string(), suite_id.into());
        }
        self.get_with(&format!("get_cases/{project_id}"), &params)
    }

    /// Add a test case to a section.
    pub fn add_case(&self, section_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("add_case/{section_id}"), Some(data))
    }

    pub fn update_case(&self, case_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("update_case/{case_id}"), Some(data))
    }

    pub fn delete_case(&self, case_id: ResourceId) -> Result<Value> {
        self.post(&format!("delete_case/{case_id}"), None)
    }
}
