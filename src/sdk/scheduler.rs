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

use crate::client::{ApiError, ArmClient, Audience};

use super::resource_path;

pub const API_VERSION: &str = "2016-03-01";

pub const SKUS: &[&str] = &["Free", "Standard", "P10Premium", "P20Premium"];
pub const STATES: &[&str] = &["Enabled", "Suspended", "Disabled"];
pub const RECURRENCE_FREQUENCIES: &[&str] = &["Minute", "Hour", "Day", "Week", "Month"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCollection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: Option<JobCollectionProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCollectionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<JobCollectionQuota>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCollectionQuota {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_job_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_recurrence: Option<JobMaxRecurrence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMaxRecurrence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
}

pub struct JobCollectionsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> JobCollectionsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, name: &str) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.Scheduler",
            &[("jobCollections", name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<JobCollection, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        collection: &JobCollection,
    ) -> Result<JobCollection, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client
            .put(url, Audience::ResourceManager, collection)
            .await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.delete_long_running(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quota_body() {
        let quota = JobCollectionQuota {
            max_job_count: Some(10),
            max_recurrence: Some(JobMaxRecurrence {
                frequency: Some("Hour".to_owned()),
                interval: Some(5),
            }),
        };
        assert_eq!(
            serde_json::to_value(&quota).unwrap(),
            json!({"maxJobCount": 10, "maxRecurrence": {"frequency": "Hour", "interval": 5}})
        );
    }
}
