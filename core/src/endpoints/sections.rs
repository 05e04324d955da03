//! Sections, the folders that group test cases inside a suite.

use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    pub fn get_section(&self, section_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_section/{section_id}"))
    }

    /// Get all sections of a project.
    ///
    /// `suite_id` is added to a copy of `params`, replacing any `suite_id`
    /// already there. The caller's map is left unchanged.
    pub fn get_sections(
        &self,
        project_id: ResourceId,
        suite_id: Option<ResourceId>,
        params: Option<&JsonObject>,
    ) -> Result<Value> {
        let mut query = params.cloned().unwrap_or_default();
        if let Some(suite_id) = suite_id {
            query.insert("suite_id".to_string(), suite_id.into());
        }
        self.get_with(&format!("get_sections/{project_id}"), &query)
    }

    pub fn add_section(&self, project_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("add_section/{project_id}"), Some(data))
    }

    pub fn update_section(&self, section_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("update_section/{section_id}"), Some(data))
    }

    /// Delete a section with its subsections and cases.
    ///
    /// With `soft` set the server only reports what would be deleted.
    pub fn delete_section(&self, section_id: ResourceId, soft: bool) -> Result<Value> {
        let uri = if soft {
            format!("delete_section/{section_id}?soft=1")
        } else {
            format!("delete_section/{section_id}")
        };
        self.post(&uri, None)
    }

    /// Move a section under another parent (`parent_id`) or after a sibling
    /// (`after_id`).
    pub fn move_section(&self, section_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("move_section/{section_id}"), Some(data))
    }
}
