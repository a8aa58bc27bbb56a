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

use serde::{Deserialize, Serialize};

use crate::client::{ApiError, ArmClient, Audience};

use super::resource_path;

pub const API_VERSION: &str = "2017-04-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<ConsumerGroupProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerGroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: Option<String>,
    #[serde(skip_serializing)]
    pub updated_at: Option<String>,
}

/// Consumer groups of an Event Hub
pub struct ConsumerGroupsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> ConsumerGroupsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(
        &self,
        resource_group: &str,
        namespace: &str,
        event_hub: &str,
        name: &str,
    ) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.EventHub",
            &[
                ("namespaces", namespace),
                ("eventhubs", event_hub),
                ("consumergroups", name),
            ],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(
        &self,
        resource_group: &str,
        namespace: &str,
        event_hub: &str,
        name: &str,
    ) -> Result<ConsumerGroup, ApiError> {
        let url = self.url(resource_group, namespace, event_hub, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        namespace: &str,
        event_hub: &str,
        name: &str,
        consumer_group: &ConsumerGroup,
    ) -> Result<ConsumerGroup, ApiError> {
        let url = self.url(resource_group, namespace, event_hub, name)?;
        self.client
            .put(url, Audience::ResourceManager, consumer_group)
            .await
    }

    pub async fn delete(
        &self,
        resource_group: &str,
        namespace: &str,
        event_hub: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(resource_group, namespace, event_hub, name)?;
        self.client.delete(url, Audience::ResourceManager).await
    }
}
