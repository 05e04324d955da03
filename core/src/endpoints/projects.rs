use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    pub fn get_project(&self, project_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_project/{project_id}"))
    }

    pub fn get_projects(&self) -> Result<Value> {
        self.get("get_projects")
    }

    pub fn add_project(&self, data: &JsonObject) -> Result<Value> {
        self.post("add_project", Some(data))
    }

    pub fn update_project(&self, project_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("update_project/{project_id}"), Some(data))
    }

    /// Delete a project with all of its suites, cases, runs and results.
    pub fn delete_project(&self, project_id: ResourceId) -> Result<Value> {
        self.post(&format!("delete_project/{project_id}"), None)
    }
}
