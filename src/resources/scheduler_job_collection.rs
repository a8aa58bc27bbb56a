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
use tracing::debug;

use tf_provider::schema::{Block, Description, NestedBlock, Schema};
use tf_provider::value::{self, Value, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Optional, OptionalComputed, Required};
use crate::helpers::tags::{self, Tags};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{
    keep_prior_case, keep_prior_location, normalize_location, owned, validate, RequiresImport,
};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::scheduler::{
    JobCollection, JobCollectionProperties, JobCollectionQuota, JobCollectionsClient,
    JobMaxRecurrence, Sku, RECURRENCE_FREQUENCIES, SKUS, STATES,
};

const DEFAULT_STATE: &str = "Enabled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuotaState<'a> {
    pub max_job_count: ValueNumber,
    #[serde(borrow = "'a")]
    pub max_recurrence_frequency: ValueString<'a>,
    pub max_retry_interval: ValueNumber,
    pub max_recurrence_interval: ValueNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerJobCollectionState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub tags: Tags<'a>,
    pub sku: ValueString<'a>,
    pub state: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub quota: Value<QuotaState<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(SchedulerJobCollectionState);

#[derive(Debug, Default, Clone, Copy)]
pub struct SchedulerJobCollection;

fn job_collection_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| validate::regex(r"^[a-zA-Z][-_a-zA-Z0-9]{0,99}$"))
}

/// `max_retry_interval` is the former name of `max_recurrence_interval`:
/// whichever is set fills the other one.
/// On update, the attribute that moved away from `prior` wins.
fn plan_quota(prior: &Value<QuotaState>, quota: &mut Value<QuotaState>) {
    let Value::Value(quota) = quota else {
        return;
    };
    if let Value::Value(prior) = prior {
        if quota.max_recurrence_interval != prior.max_recurrence_interval
            && quota.max_recurrence_interval.is_value()
        {
            quota.max_retry_interval = quota.max_recurrence_interval.clone();
        } else if quota.max_retry_interval != prior.max_retry_interval
            && quota.max_retry_interval.is_value()
        {
            quota.max_recurrence_interval = quota.max_retry_interval.clone();
        }
    }
    if quota.max_retry_interval.is_null() {
        quota.max_retry_interval = quota.max_recurrence_interval.clone();
    } else if quota.max_recurrence_interval.is_null() {
        quota.max_recurrence_interval = quota.max_retry_interval.clone();
    }
}

fn expand_quota(quota: &Value<QuotaState>) -> Option<JobCollectionQuota> {
    let Value::Value(quota) = quota else {
        return None;
    };
    let interval = [&quota.max_recurrence_interval, &quota.max_retry_interval]
        .into_iter()
        .filter_map(|interval| interval.as_ref_option().copied())
        .find(|interval| *interval > 0);

    Some(JobCollectionQuota {
        max_job_count: quota.max_job_count.as_ref_option().copied(),
        max_recurrence: Some(JobMaxRecurrence {
            frequency: quota.max_recurrence_frequency.as_deref_option().map(str::to_owned),
            interval,
        }),
    })
}

fn flatten_quota<'a>(
    quota: Option<JobCollectionQuota>,
    prior: &Value<QuotaState<'a>>,
) -> Value<QuotaState<'a>> {
    let Some(quota) = quota else {
        return Value::Null;
    };
    let recurrence = quota.max_recurrence.unwrap_or_default();
    let unset = Value::Null;
    let prior_frequency = match prior {
        Value::Value(prior) => &prior.max_recurrence_frequency,
        _ => &unset,
    };
    let interval: ValueNumber = recurrence.interval.into();

    Value::Value(QuotaState {
        max_job_count: quota.max_job_count.into(),
        max_recurrence_frequency: keep_prior_case(prior_frequency, recurrence.frequency),
        max_retry_interval: interval.clone(),
        max_recurrence_interval: interval,
    })
}

impl SchedulerJobCollection {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: SchedulerJobCollectionState<'a>,
        check_existing: bool,
    ) -> Result<SchedulerJobCollectionState<'a>> {
        let name = state.name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let collections = JobCollectionsClient::new(&ctx.client);

        if check_existing {
            let existing = collections
                .get(&resource_group, &name)
                .await
                .found()
                .with_context(|| {
                    format!("checking for the existence of Scheduler Job Collection {name:?} (Resource Group {resource_group:?})")
                })?;
            if let Some(id) = existing.and_then(|existing| existing.id) {
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
        }

        debug!(%name, %resource_group, "creating/updating Scheduler Job Collection");
        let collection = JobCollection {
            location: Some(normalize_location(state.location.as_str())),
            tags: Some(tags::expand(&state.tags)),
            properties: Some(JobCollectionProperties {
                sku: Some(Sku {
                    name: Some(state.sku.as_str().to_owned()),
                }),
                state: state.state.as_deref_option().map(str::to_owned),
                quota: expand_quota(&state.quota),
            }),
            ..Default::default()
        };
        collections
            .create_or_update(&resource_group, &name, &collection)
            .await
            .with_context(|| {
                format!("creating/updating Scheduler Job Collection {name:?} (Resource Group {resource_group:?})")
            })?;

        let created = collections.get(&resource_group, &name).await.with_context(|| {
            format!("reading Scheduler Job Collection {name:?} after create/update (Resource Group {resource_group:?})")
        })?;
        let id = created.id.ok_or_else(|| {
            anyhow!("cannot read Scheduler Job Collection {name:?} (Resource Group {resource_group:?}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Scheduler Job Collection {name:?} disappeared after being written"))
    }
}

#[async_trait]
impl AzureAdapter for SchedulerJobCollection {
    type State<'a> = SchedulerJobCollectionState<'a>;

    const NAME: &'static str = "azurerm_scheduler_job_collection";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the job collection"),
                    "location" => schema::location(),
                    "resource_group_name" => schema::resource_group_name(),
                    "tags" => tags::schema(),
                    "sku" => schema::string(Required, "Free, Standard, P10Premium or P20Premium"),
                    "state" => schema::string(OptionalComputed, "Enabled, Suspended or Disabled, defaults to Enabled"),
                },
                blocks: map! {
                    "quota" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "max_job_count" => schema::number(Optional, "Maximum number of jobs in the collection"),
                            "max_recurrence_frequency" => schema::string(Required, "Minute, Hour, Day, Week or Month"),
                            "max_retry_interval" => schema::deprecated(schema::number(OptionalComputed, "Renamed to max_recurrence_interval")),
                            "max_recurrence_interval" => schema::number(OptionalComputed, "Maximum interval between two recurrences"),
                        },
                        ..Default::default()
                    }),
                },
                description: Description::plain("Azure Scheduler job collection"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::string_matches(
            diags,
            AttributePath::new("name"),
            &config.name,
            job_collection_name_regex(),
            "Job Collection Name name must be 1 - 100 characters long, start with a letter and contain only letters, numbers, hyphens and underscores.",
        );
        schema::validate_resource_group_name(
            diags,
            AttributePath::new("resource_group_name"),
            &config.resource_group_name,
        );
        tags::validate(diags, AttributePath::new("tags"), &config.tags);
        validate::string_in_slice(diags, AttributePath::new("sku"), &config.sku, SKUS, true);
        validate::string_in_slice(diags, AttributePath::new("state"), &config.state, STATES, true);

        if let Value::Value(quota) = &config.quota {
            let path = AttributePath::new("quota").index(0);
            validate::int_at_least(diags, path.clone().attribute("max_job_count"), &quota.max_job_count, 0);
            validate::string_in_slice(
                diags,
                path.clone().attribute("max_recurrence_frequency"),
                &quota.max_recurrence_frequency,
                RECURRENCE_FREQUENCIES,
                true,
            );
            validate::int_at_least(diags, path.clone().attribute("max_retry_interval"), &quota.max_retry_interval, 1);
            validate::int_at_least(
                diags,
                path.attribute("max_recurrence_interval"),
                &quota.max_recurrence_interval,
                1,
            );
        }
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        if planned.state.is_null() {
            planned.state = Value::Value(Cow::Borrowed(DEFAULT_STATE));
        }
        plan_quota(&Value::Null, &mut planned.quota);
    }

    fn plan_update<'a>(&self, prior: &Self::State<'a>, planned: &mut Self::State<'a>) {
        if planned.state.is_null() {
            planned.state = Value::Value(Cow::Borrowed(DEFAULT_STATE));
        }
        plan_quota(&prior.quota, &mut planned.quota);
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .location("location", &prior.location, &planned.location)
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
        let name = id.segment("jobCollections")?;

        let Some(collection) = JobCollectionsClient::new(&ctx.client)
            .get(&id.resource_group, name)
            .await
            .found()
            .with_context(|| {
                format!(
                    "making Read request on Scheduler Job Collection {name:?} (Resource Group {:?})",
                    id.resource_group
                )
            })?
        else {
            return Ok(None);
        };
        let properties = collection.properties.unwrap_or_default();

        Ok(Some(SchedulerJobCollectionState {
            id: state.id.clone(),
            name: owned(Some(collection.name.as_deref().unwrap_or(name))),
            location: keep_prior_location(&state.location, collection.location),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            tags: tags::flatten(collection.tags, &state.tags),
            sku: keep_prior_case(&state.sku, properties.sku.and_then(|sku| sku.name)),
            state: keep_prior_case(&state.state, properties.state),
            quota: flatten_quota(properties.quota, &state.quota),
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
        let name = id.segment("jobCollections")?;

        JobCollectionsClient::new(&ctx.client)
            .delete(&id.resource_group, name)
            .await
            .found()
            .with_context(|| {
                format!(
                    "deleting Scheduler Job Collection {name:?} (Resource Group {:?})",
                    id.resource_group
                )
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(recurrence: Option<i64>, retry: Option<i64>) -> Value<QuotaState<'static>> {
        Value::Value(QuotaState {
            max_job_count: Value::Value(10),
            max_recurrence_frequency: Value::Value(Cow::Borrowed("hour")),
            max_retry_interval: retry.into(),
            max_recurrence_interval: recurrence.into(),
        })
    }

    #[test]
    fn retry_interval_is_an_alias() {
        let mut planned = quota(None, Some(5));
        plan_quota(&Value::Null, &mut planned);
        assert_eq!(planned, quota(Some(5), Some(5)));

        let mut planned = quota(Some(3), None);
        plan_quota(&Value::Null, &mut planned);
        assert_eq!(planned, quota(Some(3), Some(3)));

        let expanded = expand_quota(&quota(None, Some(7))).unwrap();
        assert_eq!(expanded.max_recurrence.unwrap().interval, Some(7));
    }

    fn remote(interval: i64) -> JobCollectionQuota {
        JobCollectionQuota {
            max_job_count: Some(10),
            max_recurrence: Some(JobMaxRecurrence {
                frequency: Some("Hour".to_owned()),
                interval: Some(interval),
            }),
        }
    }

    #[test]
    fn changed_interval_wins_on_update() {
        let prior = SchedulerJobCollectionState {
            quota: quota(Some(5), Some(5)),
            ..Default::default()
        };

        for planned_quota in [quota(Some(10), Some(5)), quota(Some(5), Some(10))] {
            let mut planned = SchedulerJobCollectionState {
                quota: planned_quota,
                ..Default::default()
            };
            SchedulerJobCollection.plan_update(&prior, &mut planned);
            assert_eq!(planned.quota, quota(Some(10), Some(10)));

            let sent = expand_quota(&planned.quota).unwrap();
            assert_eq!(sent.max_recurrence.unwrap().interval, Some(10));
            assert_eq!(flatten_quota(Some(remote(10)), &planned.quota), planned.quota);
        }

        let mut planned = SchedulerJobCollectionState {
            quota: quota(Some(5), Some(5)),
            ..Default::default()
        };
        SchedulerJobCollection.plan_update(&prior, &mut planned);
        assert_eq!(planned.quota, quota(Some(5), Some(5)));
    }

    #[test]
    fn quota_keeps_frequency_case() {
        let remote = JobCollectionQuota {
            max_job_count: Some(10),
            max_recurrence: Some(JobMaxRecurrence {
                frequency: Some("Hour".to_owned()),
                interval: Some(5),
            }),
        };
        assert_eq!(flatten_quota(Some(remote), &quota(Some(5), None)), quota(Some(5), Some(5)));
        assert_eq!(flatten_quota(None, &Value::Null), Value::Null);
    }

    #[test]
    fn state_defaults_to_enabled() {
        let mut planned = SchedulerJobCollectionState::default();
        SchedulerJobCollection.plan_create(&mut planned);
        assert_eq!(planned.state, Value::Value(Cow::Borrowed("Enabled")));
    }

    #[test]
    fn names() {
        let mut diags = Diagnostics::default();
        let mut config = SchedulerJobCollectionState {
            name: Value::Value(Cow::Borrowed("acctest-jobs_01")),
            sku: Value::Value(Cow::Borrowed("standard")),
            ..Default::default()
        };
        SchedulerJobCollection.validate(&mut diags, &config);
        assert!(diags.errors.is_empty());

        config.name = Value::Value(Cow::Borrowed("1jobs"));
        SchedulerJobCollection.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 1);
    }
}
