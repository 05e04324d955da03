use serde_json::Value;

use crate::client::TestRailClient;
use crate::error::Result;
use crate::http::Transport;
use crate::types::{JsonObject, ResourceId};

impl<T: Transport> TestRailClient<T> {
    pub fn get_dataset(&self, dataset_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_dataset/{dataset_id}"))
    }

    pub fn get_datasets(&self, project_id: ResourceId) -> Result<Value> {
        self.get(&format!("get_datasets/{project_id}"))
    }

    pub fn add_dataset(&self, project_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("add_dataset/{project_id}"), Some(data))
    }

    pub fn update_dataset(&self, dataset_id: ResourceId, data: &JsonObject) -> Result<Value> {
        self.post(&format!("update_dataset/{dataset_id}"), Some(data))
    }

    pub fn delete_dataset(&self, dataset_id: ResourceId) -> Result<Value> {
        self.post(&format!("delete_dataset/{dataset_id}"), None)
    }
}
