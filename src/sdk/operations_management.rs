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

pub const API_VERSION: &str = "2015-11-01-preview";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<SolutionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SolutionProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionProperties {
    #[serde(rename = "workspaceResourceId", skip_serializing_if = "Option::is_none")]
    pub workspace_resource_id: Option<String>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

/// `{solution}({workspace})`, the only name accepted for a solution
pub fn solution_name(solution: &str, workspace: &str) -> String {
    format!("{solution}({workspace})")
}

/// Reverse of [`solution_name`]
pub fn split_solution_name(name: &str) -> Option<(&str, &str)> {
    let (solution, workspace) = name.split_once('(')?;
    if workspace.contains('(') {
        return None;
    }
    Some((solution, workspace.strip_suffix(')').unwrap_or(workspace)))
}

pub struct SolutionsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> SolutionsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, name: &str) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.OperationsManagement",
            &[("solutions", name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<Solution, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        solution: &Solution,
    ) -> Result<Solution, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.put_long_running(url, solution).await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.delete_long_running(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solution_names() {
        let name = solution_name("ContainerInsights", "acctest-ws");
        assert_eq!(name, "ContainerInsights(acctest-ws)");
        assert_eq!(
            split_solution_name(&name),
            Some(("ContainerInsights", "acctest-ws"))
        );
        assert_eq!(split_solution_name("ContainerInsights"), None);
        assert_eq!(split_solution_name("a(b)(c)"), None);
    }
}
