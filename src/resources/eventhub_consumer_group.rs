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
use std::sync::OnceLock;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Optional, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{keep_prior_case, owned, validate, RequiresImport};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::eventhub::{ConsumerGroup, ConsumerGroupProperties, ConsumerGroupsClient};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventHubConsumerGroupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub namespace_name: ValueString<'a>,
    pub eventhub_name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub user_metadata: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(EventHubConsumerGroupState);

#[derive(Debug, Default, Clone, Copy)]
pub struct EventHubConsumerGroup;

fn event_hub_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| validate::regex(r"^[a-zA-Z0-9]([-._a-zA-Z0-9]{0,48}[a-zA-Z0-9])?$"))
}

fn namespace_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| validate::regex(r"^[a-zA-Z][-a-zA-Z0-9]{4,48}[a-zA-Z0-9]$"))
}

impl EventHubConsumerGroup {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: EventHubConsumerGroupState<'a>,
        check_existing: bool,
    ) -> Result<EventHubConsumerGroupState<'a>> {
        let name = state.name.as_str().to_owned();
        let namespace = state.namespace_name.as_str().to_owned();
        let event_hub = state.eventhub_name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let groups = ConsumerGroupsClient::new(&ctx.client);

        if check_existing {
            let existing = groups
                .get(&resource_group, &namespace, &event_hub, &name)
                .await
                .found()
                .with_context(|| {
                    format!("checking for the existence of Consumer Group {name:?} (EventHub {event_hub:?} / Namespace {namespace:?} / Resource Group {resource_group:?})")
                })?;
            if let Some(id) = existing.and_then(|group| group.id) {
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
        }

        let parameters = ConsumerGroup {
            name: Some(name.clone()),
            properties: Some(ConsumerGroupProperties {
                user_metadata: Some(
                    state
                        .user_metadata
                        .as_deref_option()
                        .unwrap_or_default()
                        .to_owned(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        };
        groups
            .create_or_update(&resource_group, &namespace, &event_hub, &name, &parameters)
            .await
            .with_context(|| {
                format!("creating/updating EventHub Consumer Group {name:?} (EventHub {event_hub:?} / Namespace {namespace:?})")
            })?;

        let read = groups
            .get(&resource_group, &namespace, &event_hub, &name)
            .await
            .with_context(|| format!("reading EventHub Consumer Group {name:?}"))?;
        let id = read.id.ok_or_else(|| {
            anyhow!("Cannot read EventHub Consumer Group {name} (resource group {resource_group}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("EventHub Consumer Group {name:?} disappeared after being written"))
    }
}

#[async_trait]
impl AzureAdapter for EventHubConsumerGroup {
    type State<'a> = EventHubConsumerGroupState<'a>;

    const NAME: &'static str = "azurerm_eventhub_consumer_group";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the consumer group"),
                    "namespace_name" => schema::string(Required, "Event Hubs namespace"),
                    "eventhub_name" => schema::string(Required, "Event Hub of the consumer group"),
                    "resource_group_name" => schema::resource_group_name(),
                    "location" => schema::deprecated(schema::string(Optional, "Not used anymore")),
                    "user_metadata" => schema::string(Optional, "User metadata attached to the consumer group"),
                },
                description: Description::plain("Consumer group of an Event Hub"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::string_matches(
            diags,
            AttributePath::new("name"),
            &config.name,
            event_hub_name_regex(),
            "must be 1 to 50 alphanumeric characters, dashes, dots or underscores, starting and ending with an alphanumeric character",
        );
        validate::string_matches(
            diags,
            AttributePath::new("eventhub_name"),
            &config.eventhub_name,
            event_hub_name_regex(),
            "must be 1 to 50 alphanumeric characters, dashes, dots or underscores, starting and ending with an alphanumeric character",
        );
        validate::string_matches(
            diags,
            AttributePath::new("namespace_name"),
            &config.namespace_name,
            namespace_name_regex(),
            "must be 6 to 50 alphanumeric characters or dashes, starting with a letter and ending with an alphanumeric character",
        );
        schema::validate_resource_group_name(
            diags,
            AttributePath::new("resource_group_name"),
            &config.resource_group_name,
        );
        validate::string_length(
            diags,
            AttributePath::new("user_metadata"),
            &config.user_metadata,
            1,
            1024,
        );
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .field("namespace_name", &prior.namespace_name, &planned.namespace_name)
            .field("eventhub_name", &prior.eventhub_name, &planned.eventhub_name)
            .field_ignore_case(
                "resource_group_name",
                &prior.resource_group_name,
                &planned.resource_group_name,
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
        let namespace = id.segment("namespaces")?;
        let event_hub = id.segment("eventhubs")?;
        let name = id.segment("consumergroups")?;

        let Some(group) = ConsumerGroupsClient::new(&ctx.client)
            .get(&id.resource_group, namespace, event_hub, name)
            .await
            .found()
            .with_context(|| format!("reading Azure EventHub Consumer Group {name:?}"))?
        else {
            return Ok(None);
        };
        let properties = group.properties.unwrap_or_default();

        Ok(Some(EventHubConsumerGroupState {
            id: state.id.clone(),
            name: owned(Some(name)),
            namespace_name: owned(Some(namespace)),
            eventhub_name: owned(Some(event_hub)),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            location: state.location.clone(),
            user_metadata: match properties.user_metadata {
                Some(metadata) if !metadata.is_empty() => Value::Value(Cow::Owned(metadata)),
                _ => Value::Null,
            },
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
        let namespace = id.segment("namespaces")?;
        let event_hub = id.segment("eventhubs")?;
        let name = id.segment("consumergroups")?;

        ConsumerGroupsClient::new(&ctx.client)
            .delete(&id.resource_group, namespace, event_hub, name)
            .await
            .found()
            .with_context(|| {
                format!("issuing Azure ARM delete request of EventHub Consumer Group {name:?}")
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config<'a>(name: &'a str, namespace: &'a str) -> EventHubConsumerGroupState<'a> {
        EventHubConsumerGroupState {
            name: Value::Value(Cow::Borrowed(name)),
            namespace_name: Value::Value(Cow::Borrowed(namespace)),
            eventhub_name: Value::Value(Cow::Borrowed("hub")),
            resource_group_name: Value::Value(Cow::Borrowed("rg")),
            ..Default::default()
        }
    }

    #[test]
    fn names() {
        let mut diags = Diagnostics::default();
        EventHubConsumerGroup.validate(&mut diags, &config("group.1", "acctest-ns"));
        assert!(diags.errors.is_empty());

        EventHubConsumerGroup.validate(&mut diags, &config("-group", "ns"));
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn empty_metadata_is_rejected() {
        let mut diags = Diagnostics::default();
        let mut state = config("group", "acctest-ns");
        state.user_metadata = Value::Value(Cow::Borrowed(""));
        EventHubConsumerGroup.validate(&mut diags, &state);
        assert_eq!(diags.errors.len(), 1);
    }
}
