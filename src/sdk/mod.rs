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

//! Typed models and clients of the Azure REST APIs used by the resources

use crate::client::ArmClient;

pub mod authorization;
pub mod datalake;
pub mod dns;
pub mod eventhub;
pub mod graph;
pub mod insights;
pub mod keyvault;
pub mod logic;
pub mod network;
pub mod operations_management;
pub mod scheduler;
pub mod traffic_manager;

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}/...`
pub fn resource_path(
    client: &ArmClient,
    resource_group: &str,
    namespace: &str,
    segments: &[(&str, &str)],
) -> String {
    let mut path = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}",
        client.subscription_id(),
        resource_group,
        namespace
    );
    for (kind, name) in segments {
        path.push('/');
        path.push_str(kind);
        path.push('/');
        path.push_str(name);
    }
    path
}

/// Reference to another resource by ID
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}
