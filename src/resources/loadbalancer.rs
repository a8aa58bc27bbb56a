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

//! Helpers shared by the adapters managing a sub-resource of a load balancer

use std::sync::OnceLock;

use anyhow::{anyhow, Context as _, Result};
use regex::Regex;
use tf_provider::value::ValueString;
use tf_provider::{AttributePath, Diagnostics};

use crate::client::{ArmClient, NotFoundExt};
use crate::helpers::id::ResourceId;
use crate::helpers::validate;
use crate::sdk::network::{LoadBalancer, LoadBalancersClient};

/// Resource group and name of a load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerRef {
    pub id: String,
    pub resource_group: String,
    pub name: String,
}

impl LoadBalancerRef {
    pub fn parse(id: &str) -> Result<Self> {
        let parsed = ResourceId::parse(id)
            .with_context(|| format!("getting Load Balancer name and group from {id:?}"))?;
        let name = parsed.segment("loadBalancers")?.to_owned();
        Ok(Self {
            id: id.to_owned(),
            resource_group: parsed.resource_group,
            name,
        })
    }

    /// Key serialising the writes of every rule of this load balancer
    pub fn lock_key(&self) -> String {
        format!("azurerm_lb.{}.{}", self.resource_group, self.name)
    }

    /// `None` when the load balancer does not exist
    pub async fn retrieve(&self, client: &ArmClient) -> Result<Option<LoadBalancer>> {
        LoadBalancersClient::new(client)
            .get(&self.resource_group, &self.name)
            .await
            .found()
            .with_context(|| format!("making Read request on Azure Load Balancer {:?}", self.name))
    }

    pub async fn write(&self, client: &ArmClient, load_balancer: &LoadBalancer) -> Result<LoadBalancer> {
        LoadBalancersClient::new(client)
            .create_or_update(&self.resource_group, &self.name, load_balancer)
            .await
            .with_context(|| {
                format!(
                    "updating Load Balancer {:?} (Resource Group {:?})",
                    self.name, self.resource_group
                )
            })
    }
}

fn parent_regex() -> &'static Regex {
    static PARENT: OnceLock<Regex> = OnceLock::new();
    PARENT.get_or_init(|| validate::regex(r".+/loadBalancers/.+?/"))
}

/// ID of the load balancer owning the sub-resource `id`
pub fn parent_id(id: &str) -> Result<String> {
    let parent = parent_regex()
        .find(id)
        .map(|found| found.as_str().trim_end_matches('/').to_owned())
        .ok_or_else(|| anyhow!("unable to parse loadbalancer id from {id:?}"))?;
    LoadBalancerRef::parse(&parent).map_err(|_| anyhow!("unable to parse loadbalancer id from {id:?}"))?;
    Ok(parent)
}

/// Name of the frontend ip configuration referenced by `id`
pub fn frontend_ip_configuration_name(id: &str) -> Option<String> {
    ResourceId::parse(id)
        .ok()?
        .segment("frontendIPConfigurations")
        .ok()
        .map(str::to_owned)
}

fn rule_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| validate::regex(r"^[a-zA-Z0-9]([-._a-zA-Z0-9]{0,78}[_a-zA-Z0-9])?$"))
}

/// Rule names: 1 to 80 characters among alphanumerics, dashes, dots and underscores,
/// starting with an alphanumeric and ending with an alphanumeric or an underscore
pub fn rule_name(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    validate::string_matches(
        diags,
        attr_path,
        value,
        rule_name_regex(),
        "must be 1 to 80 alphanumerics, dashes, dots or underscores, start with an alphanumeric and end with an alphanumeric or an underscore",
    );
}
