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
use url::Url;

use crate::client::{ApiError, ArmClient, Audience};

pub const API_VERSION: &str = "2018-01-01-preview";

const ASSIGNMENTS: &str = "/providers/Microsoft.Authorization/roleAssignments/";
const DEFINITIONS: &str = "/providers/Microsoft.Authorization/roleDefinitions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_definition_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<RoleAssignmentProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinitionProperties {
    #[serde(default)]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<RoleDefinitionProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RoleDefinitionList {
    #[serde(default)]
    value: Vec<RoleDefinition>,
}

/// Split a role assignment ID into its scope and name
pub fn split_assignment_id(id: &str) -> Option<(&str, &str)> {
    let (scope, name) = id.split_once(ASSIGNMENTS)?;
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some((scope, name))
    }
}

pub struct RoleAssignmentsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> RoleAssignmentsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, scope: &str, name: &str) -> Result<Url, ApiError> {
        self.client.resource_manager_url(
            &format!("{}{ASSIGNMENTS}{name}", scope.trim_end_matches('/')),
            API_VERSION,
        )
    }

    pub async fn get(&self, scope: &str, name: &str) -> Result<RoleAssignment, ApiError> {
        let url = self.url(scope, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<RoleAssignment, ApiError> {
        let url = self.client.resource_manager_url(id, API_VERSION)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create(
        &self,
        scope: &str,
        name: &str,
        properties: RoleAssignmentProperties,
    ) -> Result<RoleAssignment, ApiError> {
        let url = self.url(scope, name)?;
        let body = RoleAssignment {
            properties: Some(properties),
            ..Default::default()
        };
        self.client.put(url, Audience::ResourceManager, &body).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), ApiError> {
        let url = self.client.resource_manager_url(id, API_VERSION)?;
        self.client.delete(url, Audience::ResourceManager).await
    }
}

pub struct RoleDefinitionsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> RoleDefinitionsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    /// Role definitions visible at `scope` whose name is exactly `role_name`
    pub async fn list_by_name(
        &self,
        scope: &str,
        role_name: &str,
    ) -> Result<Vec<RoleDefinition>, ApiError> {
        let mut url = self.client.resource_manager_url(
            &format!("{}{DEFINITIONS}", scope.trim_end_matches('/')),
            API_VERSION,
        )?;
        url.query_pairs_mut()
            .append_pair("$filter", &format!("roleName eq '{role_name}'"));
        let list: RoleDefinitionList = self.client.get(url, Audience::ResourceManager).await?;
        Ok(list.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_ids() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Authorization/roleAssignments/1a2b";
        assert_eq!(
            split_assignment_id(id),
            Some(("/subscriptions/s/resourceGroups/rg", "1a2b"))
        );
        assert_eq!(split_assignment_id("/subscriptions/s"), None);
        assert_eq!(
            split_assignment_id("/subscriptions/s/providers/Microsoft.Authorization/roleAssignments/"),
            None
        );
    }

    #[test]
    fn assignment_body() {
        let body = RoleAssignment {
            properties: Some(RoleAssignmentProperties {
                role_definition_id: Some("/r".to_owned()),
                principal_id: Some("p".to_owned()),
                scope: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"properties": {"roleDefinitionId": "/r", "principalId": "p"}})
        );
    }
}
