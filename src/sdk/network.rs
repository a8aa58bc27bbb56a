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
use serde_json::{Map, Value as Json};

use crate::client::{ApiError, ArmClient, Audience};

use super::{resource_path, SubResource};

pub const API_VERSION: &str = "2018-04-01";

pub const PROTOCOLS: &[&str] = &["All", "Tcp", "Udp"];
pub const LOAD_DISTRIBUTIONS: &[&str] = &["Default", "SourceIP", "SourceIPProtocol"];

/// Load balancer, with the properties no adapter manages kept verbatim
/// so that a GET-modify-PUT leaves them untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: LoadBalancerProperties,
    #[serde(flatten)]
    pub other: Map<String, Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerProperties {
    #[serde(rename = "frontendIPConfigurations", default)]
    pub frontend_ip_configurations: Vec<FrontendIpConfiguration>,
    #[serde(default)]
    pub load_balancing_rules: Vec<LoadBalancingRule>,
    #[serde(default)]
    pub inbound_nat_rules: Vec<InboundNatRule>,
    #[serde(flatten)]
    pub other: Map<String, Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontendIpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadBalancingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: LoadBalancingRuleProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRuleProperties {
    #[serde(rename = "frontendIPConfiguration", skip_serializing_if = "Option::is_none")]
    pub frontend_ip_configuration: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_address_pool: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i64>,
    #[serde(rename = "enableFloatingIP", skip_serializing_if = "Option::is_none")]
    pub enable_floating_ip: Option<bool>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundNatRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: InboundNatRuleProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundNatRuleProperties {
    #[serde(rename = "frontendIPConfiguration", skip_serializing_if = "Option::is_none")]
    pub frontend_ip_configuration: Option<SubResource>,
    /// Set by Azure when a network interface references the rule
    #[serde(rename = "backendIPConfiguration", skip_serializing_if = "Option::is_none")]
    pub backend_ip_configuration: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<i64>,
    #[serde(rename = "enableFloatingIP", skip_serializing_if = "Option::is_none")]
    pub enable_floating_ip: Option<bool>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

impl LoadBalancer {
    pub fn frontend_ip_configuration(&self, name: &str) -> Option<&FrontendIpConfiguration> {
        self.properties
            .frontend_ip_configurations
            .iter()
            .find(|config| config.name.as_deref() == Some(name))
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.properties
            .load_balancing_rules
            .iter()
            .position(|rule| rule.name.as_deref() == Some(name))
    }

    pub fn nat_rule_index(&self, name: &str) -> Option<usize> {
        self.properties
            .inbound_nat_rules
            .iter()
            .position(|rule| rule.name.as_deref() == Some(name))
    }
}

pub struct LoadBalancersClient<'c> {
    client: &'c ArmClient,
}

impl<'c> LoadBalancersClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, name: &str) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "Microsoft.Network",
            &[("loadBalancers", name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<LoadBalancer, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        load_balancer: &LoadBalancer,
    ) -> Result<LoadBalancer, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.put_long_running(url, load_balancer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unmanaged_properties_survive_a_round_trip() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb",
            "name": "lb",
            "location": "westeurope",
            "sku": {"name": "Basic"},
            "properties": {
                "frontendIPConfigurations": [{"id": "fe-id", "name": "one", "properties": {"privateIPAllocationMethod": "Dynamic"}}],
                "backendAddressPools": [{"id": "pool"}],
                "loadBalancingRules": [],
                "provisioningState": "Succeeded"
            }
        });
        let lb: LoadBalancer = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(lb.frontend_ip_configuration("one").unwrap().id.as_deref(), Some("fe-id"));
        assert!(lb.rule_index("rule").is_none());

        let back = serde_json::to_value(&lb).unwrap();
        assert_eq!(back["sku"], body["sku"]);
        assert_eq!(back["properties"]["backendAddressPools"], body["properties"]["backendAddressPools"]);
        assert_eq!(
            back["properties"]["frontendIPConfigurations"][0]["properties"],
            body["properties"]["frontendIPConfigurations"][0]["properties"]
        );
    }
}
