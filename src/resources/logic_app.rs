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

//! Helpers shared by the adapters managing a part of a logic app workflow definition

use anyhow::{anyhow, Context as _, Result};

use crate::client::{ArmClient, NotFoundExt};
use crate::helpers::id::ResourceId;
use crate::sdk::logic::{Workflow, WorkflowsClient};

/// Resource group and name of a logic app workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRef {
    pub id: String,
    pub resource_group: String,
    pub name: String,
}

impl WorkflowRef {
    pub fn parse(id: &str) -> Result<Self> {
        let parsed = ResourceId::parse(id)
            .with_context(|| format!("getting Logic App name and group from {id:?}"))?;
        let name = parsed.segment("workflows")?.to_owned();
        Ok(Self {
            id: id.to_owned(),
            resource_group: parsed.resource_group,
            name,
        })
    }

    pub fn lock_key(&self) -> String {
        format!("azurerm_logic_app.{}.{}", self.resource_group, self.name)
    }

    /// `None` when the workflow does not exist
    pub async fn retrieve(&self, client: &ArmClient) -> Result<Option<Workflow>> {
        WorkflowsClient::new(client)
            .get(&self.resource_group, &self.name)
            .await
            .found()
            .with_context(|| {
                format!(
                    "making Read request on Logic App Workflow {:?} (Resource Group {:?})",
                    self.name, self.resource_group
                )
            })
    }

    pub async fn write(&self, client: &ArmClient, workflow: &Workflow) -> Result<Workflow> {
        WorkflowsClient::new(client)
            .create_or_update(&self.resource_group, &self.name, workflow)
            .await
            .with_context(|| {
                format!(
                    "updating Logic App Workflow {:?} (Resource Group {:?})",
                    self.name, self.resource_group
                )
            })
    }

    pub fn child_id(&self, kind: &str, name: &str) -> String {
        format!("{}/{kind}/{name}", self.id)
    }
}

/// Split `{workflow}/{kind}/{name}` into the workflow ID and the child name
pub fn split_child_id<'i>(id: &'i str, kind: &str) -> Result<(&'i str, &'i str)> {
    let separator = format!("/{kind}/");
    id.rsplit_once(&separator)
        .filter(|(workflow, name)| !workflow.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| anyhow!("{id:?} is not a Logic App {kind} ID"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WF: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Logic/workflows/wf";

    #[test]
    fn child_ids() {
        let workflow = WorkflowRef::parse(WF).unwrap();
        assert_eq!(workflow.lock_key(), "azurerm_logic_app.rg.wf");

        let id = workflow.child_id("triggers", "every-day");
        assert_eq!(split_child_id(&id, "triggers").unwrap(), (WF, "every-day"));
        assert!(split_child_id(WF, "triggers").is_err());
        assert!(split_child_id(&format!("{WF}/triggers/"), "triggers").is_err());
    }
}
