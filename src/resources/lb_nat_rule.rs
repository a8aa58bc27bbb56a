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
use crate::sdk::network::{InboundNatRule, InboundNatRuleProperties, LoadBalancer, PROTOCOLS};
use crate::sdk::SubResource;

use super::loadbalancer::{self, LoadBalancerRef};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LbNatRuleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub loadbalancer_id: ValueString<'a>,
    pub protocol: ValueString<'a>,
    pub frontend_port: ValueNumber,
    pub backend_port: ValueNumber,
    pub frontend_ip_configuration_name: ValueString<'a>,
    pub enable_floating_ip: ValueBool,
    pub frontend_ip_configuration_id: ValueString<'a>,
    pub backend_ip_configuration_id: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(LbNatRuleState);

#[derive(Debug, Default, Clone, Copy)]
pub struct LbNatRule;

fn expand_nat_rule(state: &LbNatRuleState, load_balancer: &LoadBalancer) -> Result<InboundNatRule> {
    let frontend_name = state.frontend_ip_configuration_name.as_deref_option().unwrap_or_default();
    let frontend = load_balancer
        .frontend_ip_configuration(frontend_name)
        .ok_or_else(|| {
            anyhow!("cannot find a Frontend IP Configuration named {frontend_name:?} on the Load Balancer")
        })?;

    Ok(InboundNatRule {
        name: state.name.as_deref_option().map(str::to_owned),
        properties: InboundNatRuleProperties {
            frontend_ip_configuration: frontend.id.clone().map(SubResource::new),
            protocol: state.protocol.as_deref_option().map(str::to_owned),
            frontend_port: state.frontend_port.as_ref_option().copied(),
            backend_port: state.backend_port.as_ref_option().copied(),
            enable_floating_ip: Some(
                state.enable_floating_ip.as_ref_option().copied().unwrap_or(false),
            ),
            ..Default::default()
        },
        ..Default::default()
    })
}

impl LbNatRule {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: LbNatRuleState<'a>,
        check_existing: bool,
    ) -> Result<LbNatRuleState<'a>> {
        let name = state.name.as_str().to_owned();
        let parent = LoadBalancerRef::parse(state.loadbalancer_id.as_str())?;
        let _guard = ctx.locks.lock(&parent.lock_key()).await;

        let mut load_balancer = parent.retrieve(&ctx.client).await?.ok_or_else(|| {
            anyhow!("Load Balancer {:?} (Resource Group {:?}) was not found", parent.name, parent.resource_group)
        })?;
        let mut rule = expand_nat_rule(&state, &load_balancer)?;

        let index = load_balancer.nat_rule_index(&name);
        let rules = &mut load_balancer.properties.inbound_nat_rules;
        match index {
            Some(index) if check_existing => {
                let id = rules[index]
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}/inboundNatRules/{name}", parent.id));
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
            Some(index) => {
                // the backend is attached from the network interface side
                rule.properties.backend_ip_configuration =
                    rules[index].properties.backend_ip_configuration.take();
                rules[index] = rule;
            }
            None => rules.push(rule),
        }

        let written = parent.write(&ctx.client, &load_balancer).await?;
        let id = written
            .nat_rule_index(&name)
            .and_then(|index| written.properties.inbound_nat_rules[index].id.clone())
            .ok_or_else(|| anyhow!("cannot read Load Balancer NAT Rule {name:?} ID"))?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read_from(state, &written)?
            .ok_or_else(|| anyhow!("Load Balancer NAT Rule {name:?} disappeared after being written"))
    }

    fn read_from<'a>(
        &self,
        state: LbNatRuleState<'a>,
        load_balancer: &LoadBalancer,
    ) -> Result<Option<LbNatRuleState<'a>>> {
        let id = ResourceId::parse(state.id.as_str())?;
        let name = id.segment("inboundNatRules")?;
        let Some(index) = load_balancer.nat_rule_index(name) else {
            debug!(name, "NAT rule not found on the load balancer");
            return Ok(None);
        };
        let properties = load_balancer.properties.inbound_nat_rules[index]
            .properties
            .clone();
        let frontend_id = properties
            .frontend_ip_configuration
            .and_then(|frontend| frontend.id);

        Ok(Some(LbNatRuleState {
            id: state.id.clone(),
            name: owned(Some(name)),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            location: state.location.clone(),
            loadbalancer_id: state.loadbalancer_id.clone(),
            protocol: keep_prior_case(&state.protocol, properties.protocol),
            frontend_port: properties.frontend_port.into(),
            backend_port: properties.backend_port.into(),
            frontend_ip_configuration_name: frontend_id
                .as_deref()
                .and_then(loadbalancer::frontend_ip_configuration_name)
                .map(Cow::Owned)
                .into(),
            enable_floating_ip: Value::Value(properties.enable_floating_ip.unwrap_or(false)),
            frontend_ip_configuration_id: frontend_id.map(Cow::Owned).into(),
            backend_ip_configuration_id: properties
                .backend_ip_configuration
                .and_then(|backend| backend.id)
                .map(Cow::Owned)
                .into(),
            timeouts: state.timeouts,
        }))
    }
}

#[async_trait]
impl AzureAdapter for LbNatRule {
    type State<'a> = LbNatRuleState<'a>;

    const NAME: &'static str = "azurerm_lb_nat_rule";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the NAT rule"),
                    "resource_group_name" => schema::resource_group_name(),
                    "location" => schema::deprecated(schema::string(Optional, "Not used anymore")),
                    "loadbalancer_id" => schema::string(Required, "ID of the load balancer"),
                    "protocol" => schema::string(Required, "Transport protocol: Tcp, Udp or All"),
                    "frontend_port" => schema::number(Required, "Port of the frontend, 1 to 65534"),
                    "backend_port" => schema::number(Required, "Port of the backend, 1 to 65535"),
                    "frontend_ip_configuration_name" => schema::string(Required, "Frontend IP configuration receiving the traffic"),
                    "enable_floating_ip" => schema::boolean(OptionalComputed, "Enables Direct Server Return"),
                    "frontend_ip_configuration_id" => schema::string(Computed, "ID of the frontend IP configuration"),
                    "backend_ip_configuration_id" => schema::string(Computed, "ID of the network interface IP configuration using the rule"),
                },
                description: Description::plain("Inbound NAT rule of a load balancer"),
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
        validate::int_between(diags, AttributePath::new("frontend_port"), &config.frontend_port, 1, 65534);
        validate::int_between(diags, AttributePath::new("backend_port"), &config.backend_port, 1, 65535);
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        planned.frontend_ip_configuration_id = Value::Unknown;
        planned.backend_ip_configuration_id = Value::Unknown;
        compute(&mut planned.enable_floating_ip);
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
        let name = id.segment("inboundNatRules")?;
        let parent = LoadBalancerRef::parse(state.loadbalancer_id.as_str())?;
        let _guard = ctx.locks.lock(&parent.lock_key()).await;

        let Some(mut load_balancer) = parent.retrieve(&ctx.client).await? else {
            return Ok(());
        };
        let Some(index) = load_balancer.nat_rule_index(name) else {
            return Ok(());
        };
        load_balancer.properties.inbound_nat_rules.remove(index);

        parent
            .write(&ctx.client, &load_balancer)
            .await
            .with_context(|| format!("deleting Load Balancer NAT Rule {name:?}"))?;
        Ok(())
    }

    fn import_state<'a>(&self, id: String) -> Result<Self::State<'a>> {
        let loadbalancer_id = loadbalancer::parent_id(&id)?;
        Ok(LbNatRuleState {
            id: Value::Value(Cow::Owned(id)),
            loadbalancer_id: Value::Value(Cow::Owned(loadbalancer_id)),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nat_ports_start_at_one() {
        let mut diags = Diagnostics::default();
        let config = LbNatRuleState {
            name: Value::Value(Cow::Borrowed("NatRule-1")),
            protocol: Value::Value(Cow::Borrowed("Udp")),
            frontend_port: Value::Value(0),
            backend_port: Value::Value(3389),
            ..Default::default()
        };
        LbNatRule.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn frontend_change_recomputes_its_id() {
        let prior = LbNatRuleState {
            frontend_ip_configuration_name: Value::Value(Cow::Borrowed("one")),
            frontend_ip_configuration_id: Value::Value(Cow::Borrowed("fe-one")),
            ..Default::default()
        };
        let mut planned = prior.clone();
        LbNatRule.plan_update(&prior, &mut planned);
        assert_eq!(planned.frontend_ip_configuration_id, prior.frontend_ip_configuration_id);

        planned.frontend_ip_configuration_name = Value::Value(Cow::Borrowed("two"));
        LbNatRule.plan_update(&prior, &mut planned);
        assert!(planned.frontend_ip_configuration_id.is_unknown());
    }
}
