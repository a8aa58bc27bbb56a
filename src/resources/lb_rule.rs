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

use std::borrow::Cow;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueBool, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Computed, Optional, OptionalComputed, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{changed, keep_prior_case, owned, validate, RequiresImport};
use crate::resource::{compute, AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::network::{
    LoadBalancer, LoadBalancingRule, LoadBalancingRuleProperties, LOAD_DISTRIBUTIONS, PROTOCOLS,
};
use crate::sdk::SubResource;

use super::loadbalancer::{self, LoadBalancerRef};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LbRuleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub loadbalancer_id: ValueString<'a>,
    pub frontend_ip_configuration_name: ValueString<'a>,
    pub frontend_ip_configuration_id: ValueString<'a>,
    pub backend_address_pool_id: ValueString<'a>,
    pub probe_id: ValueString<'a>,
    pub protocol: ValueString<'a>,
    pub frontend_port: ValueNumber,
    pub backend_port: ValueNumber,
    pub enable_floating_ip: ValueBool,
    pub idle_timeout_in_minutes: ValueNumber,
    pub load_distribution: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(LbRuleState);

#[derive(Debug, Default, Clone, Copy)]
pub struct LbRule;

fn sub_resource(id: &ValueString) -> Option<SubResource> {
    id.as_deref_option()
        .filter(|id| !id.is_empty())
        .map(SubResource::new)
}

/// Rule of `state` against the frontend configurations of `load_balancer`
fn expand_rule(state: &LbRuleState, load_balancer: &LoadBalancer) -> Result<LoadBalancingRule> {
    let frontend_name = state.frontend_ip_configuration_name.as_deref_option().unwrap_or_default();
    let frontend = load_balancer
        .frontend_ip_configuration(frontend_name)
        .ok_or_else(|| {
            anyhow!("cannot find a Frontend IP Configuration named {frontend_name:?} on the Load Balancer")
        })?;

    Ok(LoadBalancingRule {
        name: state.name.as_deref_option().map(str::to_owned),
        properties: LoadBalancingRuleProperties {
            frontend_ip_configuration: frontend.id.clone().map(SubResource::new),
            backend_address_pool: sub_resource(&state.backend_address_pool_id),
            probe: sub_resource(&state.probe_id),
            protocol: state.protocol.as_deref_option().map(str::to_owned),
            load_distribution: state.load_distribution.as_deref_option().map(str::to_owned),
            frontend_port: state.frontend_port.as_ref_option().copied(),
            backend_port: state.backend_port.as_ref_option().copied(),
            idle_timeout_in_minutes: state.idle_timeout_in_minutes.as_ref_option().copied(),
            enable_floating_ip: Some(
                state.enable_floating_ip.as_ref_option().copied().unwrap_or(false),
            ),
            provisioning_state: None,
        },
        ..Default::default()
    })
}

fn sub_resource_id<'a>(resource: Option<SubResource>) -> ValueString<'a> {
    resource.and_then(|resource| resource.id).map(Cow::Owned).into()
}

impl LbRule {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: LbRuleState<'a>,
        check_existing: bool,
    ) -> Result<LbRuleState<'a>> {
        let name = state.name.as_str().to_owned();
        let parent = LoadBalancerRef::parse(state.loadbalancer_id.as_str())?;
        let _guard = ctx.locks.lock(&parent.lock_key()).await;

        let mut load_balancer = parent.retrieve(&ctx.client).await?.ok_or_else(|| {
            anyhow!("Load Balancer {:?} (Resource Group {:?}) was not found", parent.name, parent.resource_group)
        })?;
        let rule = expand_rule(&state, &load_balancer)?;

        let index = load_balancer.rule_index(&name);
        let rules = &mut load_balancer.properties.load_balancing_rules;
        match index {
            Some(index) if check_existing => {
                let id = rules[index]
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}/loadBalancingRules/{name}", parent.id));
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
            Some(index) => rules[index] = rule,
            None => rules.push(rule),
        }

        let written = parent.write(&ctx.client, &load_balancer).await?;
        let id = written
            .rule_index(&name)
            .and_then(|index| written.properties.load_balancing_rules[index].id.clone())
            .ok_or_else(|| anyhow!("cannot read Load Balancer Rule {name:?} ID"))?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read_from(state, &written)?
            .ok_or_else(|| anyhow!("Load Balancer Rule {name:?} disappeared after being written"))
    }

    fn read_from<'a>(
        &self,
        state: LbRuleState<'a>,
        load_balancer: &LoadBalancer,
    ) -> Result<Option<LbRuleState<'a>>> {
        let id = ResourceId::parse(state.id.as_str())?;
        let name = id.segment("loadBalancingRules")?;
        let Some(index) = load_balancer.rule_index(name) else {
            debug!(name, "rule not found on the load balancer");
            return Ok(None);
        };
        let properties = load_balancer.properties.load_balancing_rules[index]
            .properties
            .clone();
        let frontend_id = properties
            .frontend_ip_configuration
            .and_then(|frontend| frontend.id);

        Ok(Some(LbRuleState {
            id: state.id.clone(),
            name: owned(Some(name)),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            location: state.location.clone(),
            loadbalancer_id: state.loadbalancer_id.clone(),
            frontend_ip_configuration_name: frontend_id
                .as_deref()
                .and_then(loadbalancer::frontend_ip_configuration_name)
                .map(Cow::Owned)
                .into(),
            frontend_ip_configuration_id: frontend_id.map(Cow::Owned).into(),
            backend_address_pool_id: sub_resource_id(properties.backend_address_pool),
            probe_id: sub_resource_id(properties.probe),
            protocol: keep_prior_case(&state.protocol, properties.protocol),
            frontend_port: properties.frontend_port.into(),
            backend_port: properties.backend_port.into(),
            enable_floating_ip: Value::Value(properties.enable_floating_ip.unwrap_or(false)),
            idle_timeout_in_minutes: properties.idle_timeout_in_minutes.into(),
            load_distribution: keep_prior_case(&state.load_distribution, properties.load_distribution),
            timeouts: state.timeouts,
        }))
    }
}

#[async_trait]
impl AzureAdapter for LbRule {
    type State<'a> = LbRuleState<'a>;

    const NAME: &'static str = "azurerm_lb_rule";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the load balancing rule"),
                    "resource_group_name" => schema::resource_group_name(),
                    "location" => schema::deprecated(schema::string(Optional, "Not used anymore")),
                    "loadbalancer_id" => schema::string(Required, "ID of the load balancer"),
                    "frontend_ip_configuration_name" => schema::string(Required, "Frontend IP configuration receiving the traffic"),
                    "frontend_ip_configuration_id" => schema::string(Computed, "ID of the frontend IP configuration"),
                    "backend_address_pool_id" => schema::string(Optional, "Backend address pool receiving the traffic"),
                    "probe_id" => schema::string(Optional, "Probe deciding which backends are healthy"),
                    "protocol" => schema::string(Required, "Transport protocol: Tcp, Udp or All"),
                    "frontend_port" => schema::number(Required, "Port of the frontend, 0 to 65534"),
                    "backend_port" => schema::number(Required, "Port of the backends, 0 to 65535"),
                    "enable_floating_ip" => schema::boolean(OptionalComputed, "Enables Direct Server Return"),
                    "idle_timeout_in_minutes" => schema::number(OptionalComputed, "TCP idle timeout, 4 to 30 minutes"),
                    "load_distribution" => schema::string(OptionalComputed, "Default, SourceIP or SourceIPProtocol"),
                },
                description: Description::plain("Load balancing rule of a load balancer"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        loadbalancer::rule_name(diags, AttributePath::new("name"), &config.name);
        schema::validate_resource_group_name(
            diags,
            AttributePath::new("resource_group_name"),
            &config.resource_group_name,
        );
        validate::string_in_slice(diags, AttributePath::new("protocol"), &config.protocol, PROTOCOLS, true);
        validate::int_between(diags, AttributePath::new("frontend_port"), &config.frontend_port, 0, 65534);
        validate::int_between(diags, AttributePath::new("backend_port"), &config.backend_port, 0, 65535);
        validate::int_between(
            diags,
            AttributePath::new("idle_timeout_in_minutes"),
            &config.idle_timeout_in_minutes,
            4,
            30,
        );
        validate::string_in_slice(
            diags,
            AttributePath::new("load_distribution"),
            &config.load_distribution,
            LOAD_DISTRIBUTIONS,
            true,
        );
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        planned.frontend_ip_configuration_id = Value::Unknown;
        compute(&mut planned.enable_floating_ip);
        compute(&mut planned.idle_timeout_in_minutes);
        compute(&mut planned.load_distribution);
    }

    fn plan_update<'a>(&self, prior: &Self::State<'a>, planned: &mut Self::State<'a>) {
        if changed(
            &prior.frontend_ip_configuration_name,
            &planned.frontend_ip_configuration_name,
        ) {
            planned.frontend_ip_configuration_id = Value::Unknown;
        }
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .field_ignore_case(
                "resource_group_name",
                &prior.resource_group_name,
                &planned.resource_group_name,
            )
            .field("loadbalancer_id", &prior.loadbalancer_id, &planned.loadbalancer_id)
            .build()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        self.write(ctx, planned, true).await
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let parent = LoadBalancerRef::parse(state.loadbalancer_id.as_str())?;
        let Some(load_balancer) = parent.retrieve(&ctx.client).await? else {
            debug!(load_balancer = %parent.name, "load balancer not found");
            return Ok(None);
        };
        self.read_from(state, &load_balancer)
    }

    async fn update<'a>(
        &self,
        ctx: &Context,
        _prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        self.write(ctx, planned, false).await
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let id = ResourceId::parse(state.id.as_str())?;
        let name = id.segment("loadBalancingRules")?;
        let parent = LoadBalancerRef::parse(state.loadbalancer_id.as_str())?;
        let _guard = ctx.locks.lock(&parent.lock_key()).await;

        let Some(mut load_balancer) = parent.retrieve(&ctx.client).await? else {
            return Ok(());
        };
        let Some(index) = load_balancer.rule_index(name) else {
            return Ok(());
        };
        load_balancer.properties.load_balancing_rules.remove(index);

        parent
            .write(&ctx.client, &load_balancer)
            .await
            .with_context(|| format!("deleting Load Balancer Rule {name:?}"))?;
        Ok(())
    }

    fn import_state<'a>(&self, id: String) -> Result<Self::State<'a>> {
        let loadbalancer_id = loadbalancer::parent_id(&id)?;
        Ok(LbRuleState {
            id: Value::Value(Cow::Owned(id)),
            loadbalancer_id: Value::Value(Cow::Owned(loadbalancer_id)),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::network::FrontendIpConfiguration;

    const LB: &str =
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb";

    fn state<'a>() -> LbRuleState<'a> {
        LbRuleState {
            name: Value::Value(Cow::Borrowed("http")),
            loadbalancer_id: Value::Value(Cow::Borrowed(LB)),
            frontend_ip_configuration_name: Value::Value(Cow::Borrowed("public")),
            protocol: Value::Value(Cow::Borrowed("tcp")),
            frontend_port: Value::Value(80),
            backend_port: Value::Value(8080),
            idle_timeout_in_minutes: Value::Value(4),
            ..Default::default()
        }
    }

    #[test]
    fn rule_points_at_the_named_frontend() {
        let mut load_balancer = LoadBalancer::default();
        load_balancer
            .properties
            .frontend_ip_configurations
            .push(FrontendIpConfiguration {
                id: Some(format!("{LB}/frontendIPConfigurations/public")),
                name: Some("public".to_owned()),
                ..Default::default()
            });

        let rule = expand_rule(&state(), &load_balancer).unwrap();
        assert_eq!(
            rule.properties.frontend_ip_configuration,
            Some(SubResource::new(format!("{LB}/frontendIPConfigurations/public")))
        );
        assert_eq!(rule.properties.enable_floating_ip, Some(false));
        assert!(rule.properties.probe.is_none());

        let mut other = state();
        other.frontend_ip_configuration_name = Value::Value(Cow::Borrowed("private"));
        assert!(expand_rule(&other, &load_balancer).is_err());
    }

    #[test]
    fn protocol_is_case_insensitive_and_ports_bounded() {
        let mut diags = Diagnostics::default();
        LbRule.validate(&mut diags, &state());
        assert!(diags.errors.is_empty());

        let mut invalid = state();
        invalid.frontend_port = Value::Value(65535);
        invalid.idle_timeout_in_minutes = Value::Value(31);
        LbRule.validate(&mut diags, &invalid);
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn import_derives_the_load_balancer() {
        let state = LbRule
            .import_state(format!("{LB}/loadBalancingRules/http"))
            .unwrap();
        assert_eq!(state.loadbalancer_id, Value::Value(Cow::Borrowed(LB)));
    }
}
