// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::client::{ApiError, ArmClient, Audience};

use super::resource_path;

pub const API_VERSION: &str = "2016-06-01";

pub const RECURRENCE_FREQUENCIES: &[&str] = &["Month", "Week", "Day", "Hour", "Minute", "Second"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: WorkflowProperties,
}

/// Only the definition is edited, everything else is sent back untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Map<String, Json>>,
    #[serde(flatten)]
    pub other: Map<String, Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
}

/// Trigger of a workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    Recurrence { recurrence: Recurrence },
    #[serde(other)]
    Other,
}

impl Workflow {
    fn triggers(&self) -> Option<&Map<String, Json>> {
        self.properties
            .definition
            .as_ref()?
            .get("triggers")?
            .as_object()
    }

    /// Raw definition of the trigger `name`
    pub fn trigger(&self, name: &str) -> Option<&Json> {
        self.triggers()?.get(name)
    }

    pub fn set_trigger(&mut self, name: &str, trigger: Json) {
        let definition = self.properties.definition.get_or_insert_with(Map::new);
        let triggers = definition
            .entry("triggers")
            .or_insert_with(|| Json::Object(Map::new()));
        if !triggers.is_object() {
            *triggers = Json::Object(Map::new());
        }
        if let Json::Object(triggers) = triggers {
            triggers.insert(name.to_owned(), trigger);
        }
    }

    /// Whether the trigger was present
    pub fn remove_trigger(&mut self, name: &str) -> bool {
        self.properties
            .definition
            .as_mut()
            .and_then(|definition| definition.get_mut("triggers"))
            .and_then(Json::as_object_mut)
            .and_then(|triggers| triggers.remove(name))
            .is_some()
    }
}

pub struct WorkflowsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> WorkflowsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, name: &str) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.Logic",
            &[("workflows", name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<Workflow, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        workflow: &Workflow,
    ) -> Result<Workflow, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client
            .put(url, Audience::ResourceManager, workflow)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow() -> Workflow {
        serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Logic/workflows/wf",
            "name": "wf",
            "location": "westeurope",
            "properties": {
                "state": "Enabled",
                "definition": {
                    "$schema": "https://schema.management.azure.com/providers/Microsoft.Logic/schemas/2016-06-01/workflowdefinition.json#",
                    "contentVersion": "1.0.0.0",
                    "triggers": {
                        "http": {"type": "Request", "kind": "Http"}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn triggers_are_edited_in_place() {
        let mut wf = workflow();
        wf.set_trigger(
            "every-day",
            json!({"type": "Recurrence", "recurrence": {"frequency": "Day", "interval": 1}}),
        );

        let trigger: Trigger = serde_json::from_value(wf.trigger("every-day").cloned().unwrap()).unwrap();
        assert_eq!(
            trigger,
            Trigger::Recurrence {
                recurrence: Recurrence {
                    frequency: Some("Day".to_owned()),
                    interval: Some(1),
                }
            }
        );
        let other: Trigger = serde_json::from_value(wf.trigger("http").cloned().unwrap()).unwrap();
        assert_eq!(other, Trigger::Other);

        assert!(wf.remove_trigger("every-day"));
        assert!(!wf.remove_trigger("every-day"));

        let body = serde_json::to_value(&wf).unwrap();
        assert_eq!(body["properties"]["state"], "Enabled");
        assert_eq!(body["properties"]["definition"]["contentVersion"], "1.0.0.0");
    }
}
