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

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description, Schema};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::client::{ApiError, ArmClient};
use crate::helpers::locks::KeyedLocks;
use crate::helpers::timeouts::{self, Operation, Timeouts, TimeoutsState};
use crate::helpers::{changed, changed_with, normalize_location, RequiresImport};
use crate::provider::ProviderData;

/// Fields every resource state carries
pub trait ArmState<'a> {
    fn id(&self) -> &ValueString<'a>;
    fn set_id(&mut self, id: ValueString<'a>);
    fn timeouts(&self) -> &Value<TimeoutsState<'a>>;
    fn set_timeouts(&mut self, timeouts: Value<TimeoutsState<'a>>);
}

/// Implement [`ArmState`] for a state struct with `id` and `timeouts` fields
#[macro_export]
macro_rules! arm_state {
    ($state:ident) => {
        impl<'a> $crate::resource::ArmState<'a> for $state<'a> {
            fn id(&self) -> &tf_provider::value::ValueString<'a> {
                &self.id
            }
            fn set_id(&mut self, id: tf_provider::value::ValueString<'a>) {
                self.id = id;
            }
            fn timeouts(
                &self,
            ) -> &tf_provider::value::Value<$crate::helpers::timeouts::TimeoutsState<'a>> {
                &self.timeouts
            }
            fn set_timeouts(
                &mut self,
                timeouts: tf_provider::value::Value<$crate::helpers::timeouts::TimeoutsState<'a>>,
            ) {
                self.timeouts = timeouts;
            }
        }
    };
}

/// What an adapter needs to talk to Azure during one operation
#[derive(Debug, Clone)]
pub struct Context {
    pub client: Arc<ArmClient>,
    pub locks: Arc<KeyedLocks>,
    pub deadline: Instant,
}

/// CRUD adapter of one Azure resource type
#[async_trait]
pub trait AzureAdapter: Send + Sync + 'static {
    type State<'a>: Serialize
        + Deserialize<'a>
        + ArmState<'a>
        + Debug
        + Clone
        + Default
        + Send
        + Sync;

    /// Terraform type name, used in messages
    const NAME: &'static str;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Schema without the `id` attribute and `timeouts` block
    fn schema(&self) -> Schema;

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>);

    /// Mark the computed fields of a new resource unknown
    fn plan_create<'a>(&self, _planned: &mut Self::State<'a>) {}

    /// Mark the computed fields depending on a changed field unknown
    fn plan_update<'a>(&self, _prior: &Self::State<'a>, _planned: &mut Self::State<'a>) {}

    /// Changed fields that cannot be updated in place
    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath>;

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>>;

    /// `None` when the remote object does not exist anymore
    async fn read<'a>(&self, ctx: &Context, state: Self::State<'a>)
        -> Result<Option<Self::State<'a>>>;

    /// Only called when [`replace_triggers`](Self::replace_triggers) leaves something to update
    async fn update<'a>(
        &self,
        _ctx: &Context,
        prior: Self::State<'a>,
        _planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        Err(anyhow!(
            "{} {:?} cannot be updated in place",
            Self::NAME,
            prior.id()
        ))
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()>;

    /// State used to read an imported object
    fn import_state<'a>(&self, id: String) -> Result<Self::State<'a>> {
        let mut state = <Self::State<'a> as Default>::default();
        state.set_id(Value::Value(id.into()));
        Ok(state)
    }
}

/// Collect the attribute paths of changed force-new fields
#[derive(Debug, Default)]
pub struct ReplaceTriggers {
    paths: Vec<AttributePath>,
}

impl ReplaceTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: PartialEq>(mut self, name: &'static str, prior: &Value<T>, planned: &Value<T>) -> Self {
        if changed(prior, planned) {
            self.paths.push(AttributePath::new(name));
        }
        self
    }

    pub fn field_ignore_case(
        mut self,
        name: &'static str,
        prior: &ValueString,
        planned: &ValueString,
    ) -> Self {
        if changed_with(prior, planned, str::to_lowercase) {
            self.paths.push(AttributePath::new(name));
        }
        self
    }

    pub fn location(mut self, name: &'static str, prior: &ValueString, planned: &ValueString) -> Self {
        if changed_with(prior, planned, normalize_location) {
            self.paths.push(AttributePath::new(name));
        }
        self
    }

    pub fn path(mut self, path: AttributePath, changed: bool) -> Self {
        if changed {
            self.paths.push(path);
        }
        self
    }

    pub fn build(self) -> Vec<AttributePath> {
        self.paths
    }
}

/// Mark a computed value unknown when it has not been set
pub fn compute<T>(value: &mut Value<T>) {
    if value.is_null() {
        *value = Value::Unknown;
    }
}

/// `now + timeout`, bounded by [`timeouts::MAX_TIMEOUT`]
fn deadline(now: Instant, timeout: Duration) -> Instant {
    let timeout = timeout.min(timeouts::MAX_TIMEOUT);
    now.checked_add(timeout).unwrap_or(now)
}

/// Bridge between an [`AzureAdapter`] and the plugin framework
#[derive(Debug)]
pub struct ArmResource<T: AzureAdapter> {
    adapter: T,
    provider: Arc<ProviderData>,
}

impl<T: AzureAdapter> ArmResource<T> {
    pub fn new(adapter: T, provider: Arc<ProviderData>) -> Self {
        Self { adapter, provider }
    }

    fn context(
        &self,
        diags: &mut Diagnostics,
        operation: Operation,
        block: &Value<TimeoutsState>,
    ) -> Option<Context> {
        let Some(client) = self.provider.client() else {
            diags.root_error(
                "Provider not configured",
                format!("{} requires a configured azurerm provider", T::NAME),
            );
            return None;
        };
        let timeout = self.adapter.timeouts().resolve(block, operation);
        Some(Context {
            client,
            locks: self.provider.locks(),
            deadline: deadline(Instant::now(), timeout),
        })
    }

    async fn run<F, R>(
        &self,
        diags: &mut Diagnostics,
        ctx: &Context,
        operation: Operation,
        fut: F,
    ) -> Option<R>
    where
        F: std::future::Future<Output = Result<R>> + Send,
        R: Send,
    {
        let started = Instant::now();
        match tokio::time::timeout_at(ctx.deadline, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                report(diags, T::NAME, operation, err);
                None
            }
            Err(_) => {
                report(
                    diags,
                    T::NAME,
                    operation,
                    ApiError::Timeout(ctx.deadline.saturating_duration_since(started)).into(),
                );
                None
            }
        }
    }
}

fn report(diags: &mut Diagnostics, name: &'static str, operation: Operation, err: anyhow::Error) {
    warn!(resource = name, ?operation, "operation failed: {err:#}");
    if let Some(import) = err.downcast_ref::<RequiresImport>() {
        diags.root_error("Resource already exists", import.to_string());
    } else {
        let verb = match operation {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        diags.root_error(format!("Failed to {verb} {name}"), format!("{err:#}"));
    }
}

#[async_trait]
impl<T: AzureAdapter> Resource for ArmResource<T> {
    type State<'a> = T::State<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let mut schema = self.adapter.schema();
        schema.block.attributes.insert(
            "id".to_owned(),
            Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Azure identifier of the resource"),
                constraint: AttributeConstraint::Computed,
                ..Default::default()
            },
        );
        schema.block.blocks.insert(
            "timeouts".to_owned(),
            timeouts::schema(&self.adapter.timeouts()),
        );
        Some(schema)
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        self.adapter.validate(diags, &config);
        timeouts::validate(diags, AttributePath::new("timeouts"), config.timeouts());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let ctx = self.context(diags, Operation::Read, state.timeouts())?;
        let id = state.id().clone();
        let timeouts = state.timeouts().clone();

        match self
            .run(diags, &ctx, Operation::Read, self.adapter.read(&ctx, state))
            .await?
        {
            Some(mut state) => {
                state.set_timeouts(timeouts);
                Some((state, private_state))
            }
            None => {
                info!(resource = T::NAME, ?id, "remote object not found, removing from state");
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.set_id(Value::Unknown);
        self.adapter.plan_create(&mut state);

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        state.set_id(prior_state.id().clone());
        self.adapter.plan_update(&prior_state, &mut state);

        let trigger_replace = self.adapter.replace_triggers(&prior_state, &state);
        if !trigger_replace.is_empty() {
            debug!(resource = T::NAME, ?trigger_replace, "replacement required");
        }

        Some((state, prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let ctx = self.context(diags, Operation::Create, planned_state.timeouts())?;
        let timeouts = planned_state.timeouts().clone();
        info!(resource = T::NAME, "creating");

        let mut state = self
            .run(diags, &ctx, Operation::Create, self.adapter.create(&ctx, planned_state))
            .await?;
        info!(resource = T::NAME, id = ?state.id(), "created");
        state.set_timeouts(timeouts);

        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let ctx = self.context(diags, Operation::Update, planned_state.timeouts())?;
        let timeouts = planned_state.timeouts().clone();
        info!(resource = T::NAME, id = ?prior_state.id(), "updating");

        let mut state = self
            .run(
                diags,
                &ctx,
                Operation::Update,
                self.adapter.update(&ctx, prior_state, planned_state),
            )
            .await?;
        state.set_timeouts(timeouts);

        Some((state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let ctx = self.context(diags, Operation::Delete, prior_state.timeouts())?;
        info!(resource = T::NAME, id = ?prior_state.id(), "deleting");

        self.run(diags, &ctx, Operation::Delete, self.adapter.delete(&ctx, prior_state))
            .await
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = match self.adapter.import_state(id.clone()) {
            Ok(state) => state,
            Err(err) => {
                diags.root_error(format!("Cannot import {}", T::NAME), format!("{err:#}"));
                return None;
            }
        };
        let ctx = self.context(diags, Operation::Read, state.timeouts())?;

        match self
            .run(diags, &ctx, Operation::Read, self.adapter.read(&ctx, state))
            .await?
        {
            Some(state) => Some((state, Default::default())),
            None => {
                diags.root_error(
                    "Cannot import non-existent remote object",
                    format!("{} {id:?} does not exist", T::NAME),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_bounded() {
        let now = Instant::now();
        assert_eq!(
            deadline(now, Duration::from_secs(60)),
            now + Duration::from_secs(60)
        );
        assert_eq!(deadline(now, Duration::MAX), now + timeouts::MAX_TIMEOUT);
    }
}
