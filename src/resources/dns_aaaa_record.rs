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

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Required};
use crate::helpers::tags::{self, Tags};
use crate::helpers::timeouts::{Timeouts, TimeoutsState};
use crate::helpers::{keep_prior_case, owned, validate, RequiresImport};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::dns::{AaaaRecord, RecordSet, RecordSetProperties, RecordSetsClient, RecordType};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsAaaaRecordState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub zone_name: ValueString<'a>,
    pub records: ValueSet<ValueString<'a>>,
    pub ttl: ValueNumber,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(DnsAaaaRecordState);

#[derive(Debug, Default, Clone, Copy)]
pub struct DnsAaaaRecord;

impl DnsAaaaRecord {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: DnsAaaaRecordState<'a>,
    ) -> Result<DnsAaaaRecordState<'a>> {
        let name = state.name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let zone = state.zone_name.as_str().to_owned();

        let record_set = RecordSet {
            name: Some(name.clone()),
            properties: Some(RecordSetProperties {
                metadata: Some(tags::expand(&state.tags)),
                ttl: state.ttl.as_ref_option().copied(),
                aaaa_records: Some(expand_records(&state.records)),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = RecordSetsClient::new(&ctx.client)
            .create_or_update(&resource_group, &zone, &name, RecordType::Aaaa, &record_set)
            .await
            .with_context(|| {
                format!("creating/updating DNS AAAA Record {name:?} (Zone {zone:?} / Resource Group {resource_group:?})")
            })?;
        let id = created.id.ok_or_else(|| {
            anyhow!("cannot read DNS AAAA Record {name:?} (Resource Group {resource_group:?}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("DNS AAAA Record {name:?} disappeared after being written"))
    }
}

fn expand_records(records: &ValueSet<ValueString>) -> Vec<AaaaRecord> {
    records
        .iter()
        .flatten()
        .filter_map(|record| record.as_deref_option())
        .map(|address| AaaaRecord {
            ipv6_address: Some(address.to_owned()),
        })
        .collect()
}

fn flatten_records<'a>(records: Option<Vec<AaaaRecord>>) -> ValueSet<ValueString<'a>> {
    Value::Value(
        records
            .unwrap_or_default()
            .into_iter()
            .filter_map(|record| record.ipv6_address)
            .map(|address| Value::Value(Cow::Owned(address)))
            .collect(),
    )
}

#[async_trait]
impl AzureAdapter for DnsAaaaRecord {
    type State<'a> = DnsAaaaRecordState<'a>;

    const NAME: &'static str = "azurerm_dns_aaaa_record";

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(10, 5)
    }

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the DNS AAAA Record"),
                    "resource_group_name" => schema::resource_group_name(),
                    "zone_name" => schema::string(Required, "DNS Zone in which the record is created"),
                    "records" => schema::string_set(Required, "IPv6 addresses of the record"),
                    "ttl" => schema::number(Required, "Time To Live of the record, in seconds"),
                    "tags" => tags::schema(),
                },
                description: Description::plain("DNS AAAA Record"),
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
        validate::int_at_least(diags, AttributePath::new("ttl"), &config.ttl, 1);
        if let Value::Value(records) = &config.records {
            if records.is_empty() {
                diags.error_short("At least one record is required", AttributePath::new("records"));
            }
        }
        tags::validate(diags, AttributePath::new("tags"), &config.tags);
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
            .field("zone_name", &prior.zone_name, &planned.zone_name)
            .build()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        let name = planned.name.as_str();
        let resource_group = planned.resource_group_name.as_str();
        let zone = planned.zone_name.as_str();

        let existing = RecordSetsClient::new(&ctx.client)
            .get(resource_group, zone, name, RecordType::Aaaa)
            .await
            .found()
            .with_context(|| {
                format!("checking for the existence of DNS AAAA Record {name:?} (Zone {zone:?} / Resource Group {resource_group:?})")
            })?;
        if let Some(id) = existing.and_then(|record| record.id) {
            return Err(RequiresImport::new(Self::NAME, id).into());
        }

        self.write(ctx, planned).await
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let id = ResourceId::parse(state.id.as_str())?;
        let zone = id.segment("dnszones")?;
        let name = id.segment("AAAA")?;

        let Some(record) = RecordSetsClient::new(&ctx.client)
            .get(&id.resource_group, zone, name, RecordType::Aaaa)
            .await
            .found()
            .with_context(|| format!("reading DNS AAAA record {name:?}"))?
        else {
            return Ok(None);
        };
        let properties = record.properties.unwrap_or_default();

        Ok(Some(DnsAaaaRecordState {
            id: state.id.clone(),
            name: owned(Some(name)),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            zone_name: owned(Some(zone)),
            records: flatten_records(properties.aaaa_records),
            ttl: properties.ttl.into(),
            tags: tags::flatten(properties.metadata, &state.tags),
            timeouts: state.timeouts,
        }))
    }

    async fn update<'a>(
        &self,
        ctx: &Context,
        _prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        self.write(ctx, planned).await
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let id = ResourceId::parse(state.id.as_str())?;
        let zone = id.segment("dnszones")?;
        let name = id.segment("AAAA")?;

        RecordSetsClient::new(&ctx.client)
            .delete(&id.resource_group, zone, name, RecordType::Aaaa)
            .await
            .found()
            .with_context(|| format!("deleting DNS AAAA Record {name:?} (Zone {zone:?})"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_set_is_rejected() {
        let mut diags = Diagnostics::default();
        let config = DnsAaaaRecordState {
            resource_group_name: Value::Value(Cow::Borrowed("rg")),
            records: Value::Value(Default::default()),
            ttl: Value::Value(300),
            ..Default::default()
        };
        DnsAaaaRecord.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn zone_change_forces_replacement() {
        let prior = DnsAaaaRecordState {
            name: Value::Value(Cow::Borrowed("www")),
            resource_group_name: Value::Value(Cow::Borrowed("RG")),
            zone_name: Value::Value(Cow::Borrowed("a.com")),
            ..Default::default()
        };
        let mut planned = prior.clone();
        planned.resource_group_name = Value::Value(Cow::Borrowed("rg"));
        assert!(DnsAaaaRecord.replace_triggers(&prior, &planned).is_empty());

        planned.zone_name = Value::Value(Cow::Borrowed("b.com"));
        assert_eq!(
            DnsAaaaRecord.replace_triggers(&prior, &planned),
            vec![AttributePath::new("zone_name")]
        );
    }
}
