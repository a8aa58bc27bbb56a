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

use tf_provider::schema::{Block, Description, NestedBlock, Schema};
use tf_provider::value::{self, Value, ValueList, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Computed, Optional, OptionalComputed, Required};
use crate::helpers::tags::{self, Tags};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{changed, keep_prior_case, owned, validate, RequiresImport};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::traffic_manager::{
    DnsConfig, MonitorConfig, Profile, ProfileProperties, ProfilesClient, LOCATION,
    MONITOR_PROTOCOLS, PROFILE_STATUSES, ROUTING_METHODS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DnsConfigState<'a> {
    #[serde(borrow = "'a")]
    pub relative_name: ValueString<'a>,
    pub ttl: ValueNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonitorConfigState<'a> {
    #[serde(borrow = "'a")]
    pub protocol: ValueString<'a>,
    pub port: ValueNumber,
    pub path: ValueString<'a>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrafficManagerProfileState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub profile_status: ValueString<'a>,
    pub traffic_routing_method: ValueString<'a>,
    pub dns_config: ValueList<Value<DnsConfigState<'a>>>,
    pub fqdn: ValueString<'a>,
    pub monitor_config: ValueList<Value<MonitorConfigState<'a>>>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(TrafficManagerProfileState);

#[derive(Debug, Default, Clone, Copy)]
pub struct TrafficManagerProfile;

/// The single element of a set block
fn single<'s, T>(blocks: &'s ValueList<Value<T>>) -> Option<&'s T> {
    blocks.iter().flatten().flatten().next()
}

fn text(value: &ValueString) -> Option<String> {
    value.as_deref_option().map(str::to_owned)
}

fn expand_dns_config(blocks: &ValueList<Value<DnsConfigState>>) -> Option<DnsConfig> {
    single(blocks).map(|dns| DnsConfig {
        relative_name: text(&dns.relative_name),
        ttl: dns.ttl.as_ref_option().copied(),
        ..Default::default()
    })
}

fn expand_monitor_config(blocks: &ValueList<Value<MonitorConfigState>>) -> Option<MonitorConfig> {
    single(blocks).map(|monitor| MonitorConfig {
        protocol: text(&monitor.protocol),
        port: monitor.port.as_ref_option().copied(),
        path: Some(text(&monitor.path).unwrap_or_default()),
        ..Default::default()
    })
}

fn flatten_dns_config<'a>(dns: Option<&DnsConfig>) -> ValueList<Value<DnsConfigState<'a>>> {
    Value::Value(
        dns.map(|dns| {
            Value::Value(DnsConfigState {
                relative_name: dns.relative_name.clone().map(Cow::Owned).into(),
                ttl: dns.ttl.into(),
            })
        })
        .into_iter()
        .collect(),
    )
}

fn flatten_monitor_config<'a>(
    monitor: Option<MonitorConfig>,
    prior: &ValueList<Value<MonitorConfigState<'a>>>,
) -> ValueList<Value<MonitorConfigState<'a>>> {
    let prior_protocol = single(prior)
        .map(|prior| prior.protocol.clone())
        .unwrap_or_default();
    Value::Value(
        monitor
            .map(|monitor| {
                Value::Value(MonitorConfigState {
                    protocol: keep_prior_case(&prior_protocol, monitor.protocol),
                    port: monitor.port.into(),
                    path: monitor
                        .path
                        .filter(|path| !path.is_empty())
                        .map(Cow::Owned)
                        .into(),
                })
            })
            .into_iter()
            .collect(),
    )
}

fn block_count<T>(blocks: &ValueList<Value<T>>) -> Option<usize> {
    blocks.as_ref_option().map(Vec::len)
}

impl TrafficManagerProfile {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: TrafficManagerProfileState<'a>,
        check_existing: bool,
    ) -> Result<TrafficManagerProfileState<'a>> {
        let name = state.name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let profiles = ProfilesClient::new(&ctx.client);

        if check_existing {
            let existing = profiles
                .get(&resource_group, &name)
                .await
                .found()
                .with_context(|| {
                    format!("checking for the existence of Traffic Manager Profile {name:?} (Resource Group {resource_group:?})")
                })?;
            if let Some(id) = existing.and_then(|profile| profile.id) {
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
        }

        let profile = Profile {
            name: Some(name.clone()),
            location: Some(LOCATION.to_owned()),
            tags: Some(tags::expand(&state.tags)),
            properties: Some(ProfileProperties {
                profile_status: text(&state.profile_status),
                traffic_routing_method: text(&state.traffic_routing_method),
                dns_config: expand_dns_config(&state.dns_config),
                monitor_config: expand_monitor_config(&state.monitor_config),
            }),
            ..Default::default()
        };
        profiles
            .create_or_update(&resource_group, &name, &profile)
            .await
            .with_context(|| {
                format!("creating/updating Traffic Manager Profile {name:?} (Resource Group {resource_group:?})")
            })?;

        let read = profiles.get(&resource_group, &name).await.with_context(|| {
            format!("reading Traffic Manager Profile {name:?} (Resource Group {resource_group:?})")
        })?;
        let id = read.id.ok_or_else(|| {
            anyhow!("Cannot read TrafficManager profile {name} (resource group {resource_group}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Traffic Manager Profile {name:?} disappeared after being written"))
    }
}

#[async_trait]
impl AzureAdapter for TrafficManagerProfile {
    type State<'a> = TrafficManagerProfileState<'a>;

    const NAME: &'static str = "azurerm_traffic_manager_profile";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the profile"),
                    "resource_group_name" => schema::resource_group_name(),
                    "profile_status" => schema::string(OptionalComputed, "Enabled or Disabled"),
                    "traffic_routing_method" => schema::string(Required, "Geographic, Weighted, Performance or Priority"),
                    "fqdn" => schema::string(Computed, "FQDN of the profile"),
                    "tags" => tags::schema(),
                },
                blocks: map! {
                    "dns_config" => NestedBlock::Set(Block {
                        attributes: map! {
                            "relative_name" => schema::string(Required, "Host name of the profile under trafficmanager.net"),
                            "ttl" => schema::number(Required, "TTL of the DNS responses, 30 to 999999 seconds"),
                        },
                        ..Default::default()
                    }),
                    "monitor_config" => NestedBlock::Set(Block {
                        attributes: map! {
                            "protocol" => schema::string(Required, "HTTP, HTTPS or TCP"),
                            "port" => schema::number(Required, "Port probed on the endpoints"),
                            "path" => schema::string(Optional, "Path probed with HTTP(S)"),
                        },
                        ..Default::default()
                    }),
                },
                description: Description::plain("Traffic Manager profile"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        schema::validate_resource_group_name(
            diags,
            AttributePath::new("resource_group_name"),
            &config.resource_group_name,
        );
        validate::string_in_slice(
            diags,
            AttributePath::new("profile_status"),
            &config.profile_status,
            PROFILE_STATUSES,
            true,
        );
        validate::string_in_slice(
            diags,
            AttributePath::new("traffic_routing_method"),
            &config.traffic_routing_method,
            ROUTING_METHODS,
            false,
        );
        if block_count(&config.dns_config).is_some_and(|count| count != 1) {
            diags.error_short("Exactly one dns_config block is required", AttributePath::new("dns_config"));
        }
        if block_count(&config.monitor_config).is_some_and(|count| count != 1) {
            diags.error_short(
                "Exactly one monitor_config block is required",
                AttributePath::new("monitor_config"),
            );
        }
        if let Some(dns) = single(&config.dns_config) {
            validate::int_between(diags, AttributePath::new("dns_config").attribute("ttl"), &dns.ttl, 30, 999999);
        }
        if let Some(monitor) = single(&config.monitor_config) {
            validate::string_in_slice(
                diags,
                AttributePath::new("monitor_config").attribute("protocol"),
                &monitor.protocol,
                MONITOR_PROTOCOLS,
                true,
            );
            validate::int_between(
                diags,
                AttributePath::new("monitor_config").attribute("port"),
                &monitor.port,
                1,
                65535,
            );
        }
        tags::validate(diags, AttributePath::new("tags"), &config.tags);
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        planned.fqdn = Value::Unknown;
        if planned.profile_status.is_null() {
            planned.profile_status = Value::Unknown;
        }
    }

    fn plan_update<'a>(&self, prior: &Self::State<'a>, planned: &mut Self::State<'a>) {
        let relative_name = |state: &Self::State<'a>| {
            single(&state.dns_config)
                .map(|dns| dns.relative_name.clone())
                .unwrap_or_default()
        };
        if changed(&relative_name(prior), &relative_name(planned)) {
            planned.fqdn = Value::Unknown;
        }
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        let relative_name = |state: &Self::State<'a>| {
            single(&state.dns_config)
                .map(|dns| dns.relative_name.clone())
                .unwrap_or_default()
        };
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .field_ignore_case(
                "resource_group_name",
                &prior.resource_group_name,
                &planned.resource_group_name,
            )
            .path(
                AttributePath::new("dns_config"),
                changed(&relative_name(prior), &relative_name(planned)),
            )
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
        let id = ResourceId::parse(state.id.as_str())?;
        let name = id.segment("trafficManagerProfiles")?;

        let Some(profile) = ProfilesClient::new(&ctx.client)
            .get(&id.resource_group, name)
            .await
            .found()
            .with_context(|| format!("making Read request on Traffic Manager Profile {name:?}"))?
        else {
            return Ok(None);
        };
        let properties = profile.properties.unwrap_or_default();

        Ok(Some(TrafficManagerProfileState {
            id: state.id.clone(),
            name: owned(Some(profile.name.as_deref().unwrap_or(name))),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            profile_status: keep_prior_case(&state.profile_status, properties.profile_status),
            traffic_routing_method: properties.traffic_routing_method.map(Cow::Owned).into(),
            dns_config: flatten_dns_config(properties.dns_config.as_ref()),
            fqdn: properties
                .dns_config
                .and_then(|dns| dns.fqdn)
                .map(Cow::Owned)
                .into(),
            monitor_config: flatten_monitor_config(properties.monitor_config, &state.monitor_config),
            tags: tags::flatten(profile.tags, &state.tags),
            timeouts: state.timeouts,
        }))
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
        let name = id.segment("trafficManagerProfiles")?;

        ProfilesClient::new(&ctx.client)
            .delete(&id.resource_group, name)
            .await
            .found()
            .with_context(|| format!("deleting Traffic Manager Profile {name:?}"))?;
        Ok(())
    }
}
