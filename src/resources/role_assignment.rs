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

use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::{ApiError, NotFoundExt};
use crate::helpers::retry::{retry_until, Backoff};
use crate::helpers::schema::{self, Optional, OptionalComputed, Required};
use crate::helpers::timeouts::{Timeouts, TimeoutsState};
use crate::helpers::{keep_prior_case, owned, RequiresImport};
use crate::resource::{compute, AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::authorization::{
    split_assignment_id, RoleAssignmentProperties, RoleAssignmentsClient, RoleDefinitionsClient,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoleAssignmentState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub scope: ValueString<'a>,
    pub role_definition_id: ValueString<'a>,
    pub role_definition_name: ValueString<'a>,
    pub principal_id: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(RoleAssignmentState);

#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAssignment;

/// A principal created a moment ago may not be visible to the authorization
/// service yet: every rejection but a conflict is worth another attempt.
fn retryable(err: &ApiError) -> bool {
    match err {
        ApiError::Status { status, .. } => *status != 409,
        ApiError::NotFound { .. } | ApiError::Transport(_) => true,
        _ => false,
    }
}

impl RoleAssignment {
    async fn role_definition_id(&self, ctx: &Context, state: &RoleAssignmentState<'_>) -> Result<String> {
        if let Value::Value(id) = &state.role_definition_id {
            return Ok(id.to_string());
        }
        let Value::Value(role_name) = &state.role_definition_name else {
            bail!("either role_definition_id or role_definition_name needs to be set");
        };

        let definitions = RoleDefinitionsClient::new(&ctx.client)
            .list_by_name(state.scope.as_str(), role_name)
            .await
            .context("loading Role Definition List")?;
        match definitions.as_slice() {
            [definition] => definition
                .id
                .clone()
                .ok_or_else(|| anyhow!("Role Definition {role_name:?} has no ID")),
            _ => Err(anyhow!(
                "loading Role Definition List: could not find role {role_name:?}"
            )),
        }
    }
}

#[async_trait]
impl AzureAdapter for RoleAssignment {
    type State<'a> = RoleAssignmentState<'a>;

    const NAME: &'static str = "azurerm_role_assignment";

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(5, 5)
    }

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(OptionalComputed, "GUID of the assignment, generated when unset"),
                    "scope" => schema::string(Required, "Scope at which the role is assigned"),
                    "role_definition_id" => schema::string(OptionalComputed, "ID of the assigned role definition"),
                    "role_definition_name" => schema::string(Optional, "Name of the assigned role definition"),
                    "principal_id" => schema::string(Required, "Object ID of the principal receiving the role"),
                },
                description: Description::plain("Assignment of a role to a principal at a given scope"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        if config.role_definition_id.is_value() && config.role_definition_name.is_value() {
            diags.error(
                "Conflicting attributes",
                "role_definition_id conflicts with role_definition_name",
                AttributePath::new("role_definition_name"),
            );
        }
        if config.role_definition_id.is_null() && config.role_definition_name.is_null() {
            diags.root_error_short("either role_definition_id or role_definition_name needs to be set");
        }
        if let Value::Value(role_name) = &config.role_definition_name {
            if role_name.contains("(Preview)") {
                diags.error(
                    "Invalid role definition name",
                    "Preview roles are not supported",
                    AttributePath::new("role_definition_name"),
                );
            }
        }
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        compute(&mut planned.name);
        compute(&mut planned.role_definition_id);
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .field("scope", &prior.scope, &planned.scope)
            .field_ignore_case("role_definition_id", &prior.role_definition_id, &planned.role_definition_id)
            .field("role_definition_name", &prior.role_definition_name, &planned.role_definition_name)
            .field("principal_id", &prior.principal_id, &planned.principal_id)
            .build()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        let scope = planned.scope.as_str().to_owned();
        let assignments = RoleAssignmentsClient::new(&ctx.client);

        let role_definition_id = self.role_definition_id(ctx, &planned).await?;

        let name = match &planned.name {
            Value::Value(name) => {
                let name = name.to_string();
                let existing = assignments
                    .get(&scope, &name)
                    .await
                    .found()
                    .with_context(|| {
                        format!("checking for the existence of Role Assignment {name:?}")
                    })?;
                if let Some(id) = existing.and_then(|existing| existing.id) {
                    return Err(RequiresImport::new(Self::NAME, id).into());
                }
                name
            }
            _ => Uuid::new_v4().to_string(),
        };

        let properties = RoleAssignmentProperties {
            role_definition_id: Some(role_definition_id.clone()),
            principal_id: Some(planned.principal_id.as_str().to_owned()),
            scope: None,
        };
        debug!(%name, %scope, role = %role_definition_id, "assigning role");
        retry_until(ctx.deadline, Backoff::default(), retryable, || {
            assignments.create(&scope, &name, properties.clone())
        })
        .await
        .with_context(|| format!("creating Role Assignment {name:?} (Scope {scope:?})"))?;

        let created = assignments
            .get(&scope, &name)
            .await
            .with_context(|| format!("retrieving Role Assignment {name:?} (Scope {scope:?})"))?;
        let id = created
            .id
            .ok_or_else(|| anyhow!("cannot read Role Assignment ID for {name:?} (Scope {scope:?})"))?;
        info!(%id, "role assigned");

        let mut state = planned;
        state.id = Value::Value(Cow::Owned(id));
        state.role_definition_id = Value::Value(Cow::Owned(role_definition_id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Role Assignment {name:?} disappeared after creation"))
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let id = state.id.as_str();
        if split_assignment_id(id).is_none() {
            bail!("{id:?} is not a Role Assignment ID");
        }

        let Some(assignment) = RoleAssignmentsClient::new(&ctx.client)
            .get_by_id(id)
            .await
            .found()
            .with_context(|| format!("loading Role Assignment {id:?}"))?
        else {
            return Ok(None);
        };
        let properties = assignment.properties.unwrap_or_default();

        Ok(Some(RoleAssignmentState {
            id: state.id.clone(),
            name: owned(assignment.name.as_deref()),
            scope: owned(properties.scope.as_deref()),
            role_definition_id: keep_prior_case(&state.role_definition_id, properties.role_definition_id),
            role_definition_name: state.role_definition_name.clone(),
            principal_id: owned(properties.principal_id.as_deref()),
            timeouts: state.timeouts,
        }))
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let id = state.id.as_str();
        RoleAssignmentsClient::new(&ctx.client)
            .delete_by_id(id)
            .await
            .found()
            .with_context(|| format!("deleting Role Assignment {id:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: Option<&'static str>, name: Option<&'static str>) -> RoleAssignmentState<'static> {
        RoleAssignmentState {
            scope: Value::Value(Cow::Borrowed("/subscriptions/s")),
            principal_id: Value::Value(Cow::Borrowed("p")),
            role_definition_id: id.map(Cow::Borrowed).into(),
            role_definition_name: name.map(Cow::Borrowed).into(),
            ..Default::default()
        }
    }

    #[test]
    fn role_definition_is_required_once() {
        let mut diags = Diagnostics::default();
        RoleAssignment.validate(&mut diags, &config(Some("/r"), None));
        RoleAssignment.validate(&mut diags, &config(None, Some("Reader")));
        assert!(diags.errors.is_empty());

        let mut diags = Diagnostics::default();
        RoleAssignment.validate(&mut diags, &config(Some("/r"), Some("Reader")));
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        RoleAssignment.validate(&mut diags, &config(None, None));
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn preview_roles_are_rejected() {
        let mut diags = Diagnostics::default();
        RoleAssignment.validate(&mut diags, &config(None, Some("Storage Blob Data Reader (Preview)")));
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn conflicts_are_not_retried() {
        let conflict = ApiError::Status {
            status: 409,
            code: "RoleAssignmentExists".to_owned(),
            message: String::new(),
        };
        let missing_principal = ApiError::Status {
            status: 400,
            code: "PrincipalNotFound".to_owned(),
            message: String::new(),
        };
        assert!(!retryable(&conflict));
        assert!(retryable(&missing_principal));
    }

    #[test]
    fn role_definition_id_ignores_case() {
        let prior = config(Some("/subscriptions/s/providers/Microsoft.Authorization/roleDefinitions/abc"), None);
        let mut planned = prior.clone();
        planned.role_definition_id =
            Value::Value(Cow::Borrowed("/subscriptions/s/providers/microsoft.authorization/roledefinitions/ABC"));
        assert!(RoleAssignment.replace_triggers(&prior, &planned).is_empty());
    }
}
