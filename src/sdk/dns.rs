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

pub const API_VERSION: &str = "2018-03-01-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Aaaa,
}

impl RecordType {
    fn as_str(self) -> &'static str {
        match self {
            RecordType::Aaaa => "AAAA",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: Option<RecordSetProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(rename = "AAAARecords", skip_serializing_if = "Option::is_none")]
    pub aaaa_records: Option<Vec<AaaaRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AaaaRecord {
    #[serde(rename = "ipv6Address", skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
}

/// Record sets of a DNS zone
pub struct RecordSetsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> RecordSetsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.Network",
            &[("dnszones", zone), (record_type.as_str(), name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<RecordSet, ApiError> {
        let url = self.url(resource_group, zone, record_type, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
        record_set: &RecordSet,
    ) -> Result<RecordSet, ApiError> {
        let url = self.url(resource_group, zone, record_type, name)?;
        self.client
            .put(url, Audience::ResourceManager, record_set)
            .await
    }

    pub async fn delete(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<(), ApiError> {
        let url = self.url(resource_group, zone, record_type, name)?;
        self.client.delete(url, Audience::ResourceManager).await
    }
}
