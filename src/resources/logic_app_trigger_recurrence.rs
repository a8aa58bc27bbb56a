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

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::helpers::schema::{self, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{keep_prior_case, owned, validate, RequiresImport};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::logic::{Recurrence, Trigger, Workflow, RECURRENCE_FREQUENCIES};

use super::logic_app::{split_child_id, WorkflowRef};

const TRIGGERS: &str = "triggers";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogicAppTriggerRecurrenceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub logic_app_id: ValueString<'a>,
    pub frequency: ValueString<'a>,
    pub interval: ValueNumber,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(LogicAppTriggerRecurrenceState);

#[derive(Debug, Default, Clone, Copy)]
pub struct LogicAppTriggerRecurrence;

fn expand_trigger(state: &LogicAppTriggerRecurrenceState) -> Result<serde_json::Value> {
    let trigger = Trigger::Recurrence {
        recurrence: Recurrence {
            frequency: state.frequency.as_deref_option().map(str::to_owned),
            interval: state.interval.as_ref_option().copied(),
        },
    };
    Ok(serde_json::to_value(trigger)?)
}

impl LogicAppTriggerRecurrence {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: LogicAppTriggerRecurrenceState<'a>,
        check_existing: bool,
    ) -> Result<LogicAppTriggerRecurrenceState<'a>> {
        let name = state.name.as_str().to_owned();
        let workflow = WorkflowRef::parse(state.logic_app_id.as_str())?;
        let id = workflow.child_id(TRIGGERS, &name);
        let _guard = ctx.locks.lock(&workflow.lock_key()).await;

        let mut remote = workflow.retrieve(&ctx.client).await?.ok_or_else(|| {
            anyhow!(
                "Logic App Workflow {:?} (Resource Group {:?}) was not found",
                workflow.name,
                workflow.resource_group
            )
        })?;
        if check_existing && remote.trigger(&name).is_some() {
            return Err(RequiresImport::new(Self::NAME, id).into());
        }

        debug!(trigger = %name, workflow = %workflow.name, "writing recurrence trigger");
        remote.set_trigger(&name, expand_trigger(&state)?);
        let written = workflow.write(&ctx.client, &remote).await?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read_from(state, &written)?
            .ok_or_else(|| anyhow!("Trigger {name:?} disappeared after being written"))
    }

    fn read_from<'a>(
        &self,
        state: LogicAppTriggerRecurrenceState<'a>,
        workflow: &Workflow,
    ) -> Result<Option<LogicAppTriggerRecurrenceState<'a>>> {
        let (logic_app_id, name) = split_child_id(state.id.as_str(), TRIGGERS)?;
        let Some(raw) = workflow.trigger(name) else {
            debug!(trigger = name, "trigger not found in the workflow definition");
            return Ok(None);
        };
        let recurrence = match serde_json::from_value(raw.clone()) {
            Ok(Trigger::Recurrence { recurrence }) => recurrence,
            Ok(Trigger::Other) | Err(_) => {
                return Err(anyhow!("Trigger {name:?} is not a recurrence trigger"));
            }
        };

        Ok(Some(LogicAppTriggerRecurrenceState {
            id: state.id.clone(),
            name: owned(Some(name)),
            logic_app_id: keep_prior_case(&state.logic_app_id, Some(logic_app_id.to_owned())),
            frequency: keep_prior_case(&state.frequency, recurrence.frequency),
            interval: recurrence.interval.into(),
            timeouts: state.timeouts.clone(),
        }))
    }
}

#[async_trait]
impl AzureAdapter for LogicAppTriggerRecurrence {
    type State<'a> = LogicAppTriggerRecurrenceState<'a>;

    const NAME: &'static str = "azurerm_logic_app_trigger_recurrence";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the trigger"),
                    "logic_app_id" => schema::string(Required, "ID of the logic app workflow"),
                    "frequency" => schema::string(Required, "Month, Week, Day, Hour, Minute or Second"),
                    "interval" => schema::number(Required, "Number of frequency units between two runs"),
                },
                description: Description::plain("Recurrence trigger of a logic app workflow"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::not_empty(diags, AttributePath::new("name"), &config.name);
        validate::string_in_slice(
            diags,
            AttributePath::new("frequency"),
            &config.frequency,
            RECURRENCE_FREQUENCIES,
            true,
        );
        validate::int_at_least(diags, AttributePath::new("interval"), &config.interval, 1);
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .field_ignore_case("logic_app_id", &prior.logic_app_id, &planned.logic_app_id)
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
        let (logic_app_id, _) = split_child_id(state.id.as_str(), TRIGGERS)?;
        let workflow = WorkflowRef::parse(logic_app_id)?;

        match workflow.retrieve(&ctx.client).await? {
            Some(remote) => self.read_from(state, &remote),
            None => Ok(None),
        }
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
        let (logic_app_id, name) = split_child_id(state.id.as_str(), TRIGGERS)?;
        let workflow = WorkflowRef::parse(logic_app_id)?;
        let _guard = ctx.locks.lock(&workflow.lock_key()).await;

        let Some(mut remote) = workflow.retrieve(&ctx.client).await? else {
            return Ok(());
        };
        if remote.remove_trigger(name) {
            workflow.write(&ctx.client, &remote).await?;
        }
        Ok(())
    }

    fn import_state<'a>(&self, id: String) -> Result<Self::State<'a>> {
        let (logic_app_id, _) = split_child_id(&id, TRIGGERS)?;
        let logic_app_id = logic_app_id.to_owned();
        Ok(LogicAppTriggerRecurrenceState {
            id: Value::Value(Cow::Owned(id)),
            logic_app_id: Value::Value(Cow::Owned(logic_app_id)),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WF: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Logic/workflows/wf";

    fn state(frequency: &'static str, interval: i64) -> LogicAppTriggerRecurrenceState<'static> {
        LogicAppTriggerRecurrenceState {
            id: Value::Value(Cow::Owned(format!("{WF}/triggers/frequency-trigger"))),
            name: Value::Value(Cow::Borrowed("frequency-trigger")),
            logic_app_id: Value::Value(Cow::Borrowed(WF)),
            frequency: Value::Value(Cow::Borrowed(frequency)),
            interval: Value::Value(interval),
            ..Default::default()
        }
    }

    #[test]
    fn trigger_is_read_from_definition() {
        let mut workflow = Workflow::default();
        workflow.set_trigger("frequency-trigger", expand_trigger(&state("Week", 2)).unwrap());
        assert_eq!(
            workflow.trigger("frequency-trigger"),
            Some(&json!({"type": "Recurrence", "recurrence": {"frequency": "Week", "interval": 2}}))
        );

        let read = LogicAppTriggerRecurrence
            .read_from(state("week", 1), &workflow)
            .unwrap()
            .unwrap();
        assert_eq!(read.frequency, Value::Value(Cow::Borrowed("week")));
        assert_eq!(read.interval, Value::Value(2));
        assert_eq!(read.name, Value::Value(Cow::Borrowed("frequency-trigger")));
    }

    #[test]
    fn missing_trigger_is_absent() {
        let read = LogicAppTriggerRecurrence
            .read_from(state("Day", 1), &Workflow::default())
            .unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn import_derives_workflow() {
        let imported = LogicAppTriggerRecurrence
            .import_state(format!("{WF}/triggers/frequency-trigger"))
            .unwrap();
        assert_eq!(imported.logic_app_id, Value::Value(Cow::Borrowed(WF)));
    }
}
