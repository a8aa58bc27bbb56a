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
use tf_provider::value::{self, Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::ResourceId;
use crate::helpers::schema::{self, Computed, Optional, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{
    changed, keep_prior_case, keep_prior_location, normalize_location, owned, RequiresImport,
};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::operations_management::{
    solution_name, split_solution_name, Solution, SolutionPlan, SolutionProperties,
    SolutionsClient,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SolutionPlanState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub publisher: ValueString<'a>,
    pub promotion_code: ValueString<'a>,
    pub product: ValueString<'a>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogAnalyticsSolutionState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub solution_name: ValueString<'a>,
    pub workspace_name: ValueString<'a>,
    pub workspace_resource_id: ValueString<'a>,
    pub location: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub plan: Value<SolutionPlanState<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(LogAnalyticsSolutionState);

#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalyticsSolution;

fn expand_plan(plan: &Value<SolutionPlanState>, name: &str) -> SolutionPlan {
    let text = |value: &ValueString| value.as_deref_option().unwrap_or_default().to_owned();
    match plan {
        Value::Value(plan) => SolutionPlan {
            name: Some(name.to_owned()),
            publisher: Some(text(&plan.publisher)),
            promotion_code: Some(text(&plan.promotion_code)),
            product: Some(text(&plan.product)),
        },
        _ => SolutionPlan {
            name: Some(name.to_owned()),
            ..Default::default()
        },
    }
}

fn flatten_plan<'a>(
    plan: SolutionPlan,
    prior: &Value<SolutionPlanState<'a>>,
) -> Value<SolutionPlanState<'a>> {
    let promotion_code = match (plan.promotion_code, prior) {
        (Some(code), _) if !code.is_empty() => Value::Value(Cow::Owned(code)),
        (_, Value::Value(prior)) if prior.promotion_code.is_value() => {
            Value::Value(Cow::Borrowed(""))
        }
        _ => Value::Null,
    };
    Value::Value(SolutionPlanState {
        name: plan.name.map(Cow::Owned).into(),
        publisher: plan.publisher.map(Cow::Owned).into(),
        promotion_code,
        product: plan.product.map(Cow::Owned).into(),
    })
}

impl LogAnalyticsSolution {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: LogAnalyticsSolutionState<'a>,
        check_existing: bool,
    ) -> Result<LogAnalyticsSolutionState<'a>> {
        let solution = state.solution_name.as_str().to_owned();
        let workspace = state.workspace_name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let name = solution_name(&solution, &workspace);
        let solutions = SolutionsClient::new(&ctx.client);

        if check_existing {
            let existing = solutions
                .get(&resource_group, &name)
                .await
                .found()
                .with_context(|| {
                    format!("checking for the existence of Log Analytics Solution {solution:?} (Workspace {workspace:?} / Resource Group {resource_group:?})")
                })?;
            if let Some(id) = existing.and_then(|existing| existing.id) {
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
        }

        let parameters = Solution {
            name: Some(name.clone()),
            location: Some(normalize_location(state.location.as_str())),
            plan: Some(expand_plan(&state.plan, &name)),
            properties: Some(SolutionProperties {
                workspace_resource_id: Some(state.workspace_resource_id.as_str().to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        solutions
            .create_or_update(&resource_group, &name, &parameters)
            .await
            .with_context(|| {
                format!("creating/updating Log Analytics Solution {name:?} (Resource Group {resource_group:?})")
            })?;

        let created = solutions.get(&resource_group, &name).await.with_context(|| {
            format!("retrieving Log Analytics Solution {name:?} (Resource Group {resource_group:?})")
        })?;
        let id = created.id.ok_or_else(|| {
            anyhow!("Cannot read Log Analytics Solution {name:?} (Resource Group {resource_group:?}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Log Analytics Solution {name:?} disappeared after being written"))
    }
}

#[async_trait]
impl AzureAdapter for LogAnalyticsSolution {
    type State<'a> = LogAnalyticsSolutionState<'a>;

    const NAME: &'static str = "azurerm_log_analytics_solution";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "solution_name" => schema::string(Required, "Name of the solution, e.g. ContainerInsights"),
                    "workspace_name" => schema::string(Required, "Name of the Log Analytics workspace"),
                    "workspace_resource_id" => schema::string(Required, "ID of the Log Analytics workspace"),
                    "location" => schema::location(),
                    "resource_group_name" => schema::resource_group_name(),
                },
                blocks: map! {
                    "plan" => NestedBlock::Single(Block {
                        attributes: map! {
                            "name" => schema::string(Computed, "Name of the plan, same as the solution"),
                            "publisher" => schema::string(Required, "Publisher of the solution"),
                            "promotion_code" => schema::string(Optional, "Promotion code of the solution"),
                            "product" => schema::string(Required, "Product of the solution, e.g. OMSGallery/ContainerInsights"),
                        },
                        ..Default::default()
                    }),
                },
                description: Description::plain("Log Analytics (formerly OMS) solution"),
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
        if let (Value::Value(solution), Value::Value(workspace)) =
            (&config.solution_name, &config.workspace_name)
        {
            if solution.contains('(') || workspace.contains('(') {
                diags.error_short(
                    "Solution and workspace names may not contain parentheses",
                    AttributePath::new("solution_name"),
                );
            }
        }
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        if let Value::Value(plan) = &mut planned.plan {
            plan.name = Value::Unknown;
        }
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        let plan_field = |field: for<'s> fn(&'s SolutionPlanState<'a>) -> &'s ValueString<'a>| match (
            &prior.plan,
            &planned.plan,
        ) {
            (Value::Value(prior), Value::Value(planned)) => changed(field(prior), field(planned)),
            (prior, planned) => prior != planned,
        };
        ReplaceTriggers::new()
            .field("solution_name", &prior.solution_name, &planned.solution_name)
            .field("workspace_name", &prior.workspace_name, &planned.workspace_name)
            .field_ignore_case(
                "workspace_resource_id",
                &prior.workspace_resource_id,
                &planned.workspace_resource_id,
            )
            .location("location", &prior.location, &planned.location)
            .field_ignore_case(
                "resource_group_name",
                &prior.resource_group_name,
                &planned.resource_group_name,
            )
            .path(
                AttributePath::new("plan").attribute("publisher"),
                plan_field(|plan| &plan.publisher),
            )
            .path(
                AttributePath::new("plan").attribute("promotion_code"),
                plan_field(|plan| &plan.promotion_code),
            )
            .path(
                AttributePath::new("plan").attribute("product"),
                plan_field(|plan| &plan.product),
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
        let name = id.segment("solutions")?;

        let Some(solution) = SolutionsClient::new(&ctx.client)
            .get(&id.resource_group, name)
            .await
            .found()
            .with_context(|| {
                format!("making Read request on AzureRM Log Analytics solutions {name:?}")
            })?
        else {
            return Ok(None);
        };

        let plan = solution.plan.ok_or_else(|| {
            anyhow!("making Read request on AzureRM Log Analytics solutions {name:?}: Plan was nil")
        })?;
        let remote_name = solution.name.as_deref().unwrap_or(name);
        let (solution_name, workspace_name) = split_solution_name(remote_name).ok_or_else(|| {
            anyhow!("Log Analytics solution name {remote_name:?} isn't in expected format 'Solution(WorkspaceName)'")
        })?;

        Ok(Some(LogAnalyticsSolutionState {
            id: state.id.clone(),
            solution_name: owned(Some(solution_name)),
            workspace_name: owned(Some(workspace_name)),
            workspace_resource_id: keep_prior_case(
                &state.workspace_resource_id,
                solution
                    .properties
                    .and_then(|properties| properties.workspace_resource_id),
            ),
            location: keep_prior_location(&state.location, solution.location),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            plan: flatten_plan(plan, &state.plan),
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
        let name = id.segment("solutions")?;

        SolutionsClient::new(&ctx.client)
            .delete(&id.resource_group, name)
            .await
            .found()
            .with_context(|| {
                format!(
                    "deleting Log Analytics Solution {name:?} (Resource Group {:?})",
                    id.resource_group
                )
            })?;
        Ok(())
    }
}
