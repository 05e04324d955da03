//! Test runs.

use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    pub fn get_run(&self, run_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_run/{run_id}"))
    }

    /// Get all test runs of a project.
    pub fn get_runs(&self, project_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_runs/{project_id}"))
    }

    pub fn add_run(&self, project_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("add_run/{project_id}"), Some(data))
    }

    pub fn update_run(&self, run_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("update_run/{run_id}"), Some(data))
    }

    /// Close a run and archive its tests and results. Closed runs can no
    /// longer be edited.
    pub fn close_run(&self, run_id: ResourceId) -> Result<Value> {
        self.post(&format!("close_run/{run_id}"), None)
    }

    pub fn delete_run(&self, run_id: ResourceId) -> Result<Value> {
        self.post(&format!("delete_run/{run_id}"), None)
    }
}
