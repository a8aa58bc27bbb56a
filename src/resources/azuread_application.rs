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
use tf_provider::value::{self, Value, ValueBool, ValueList, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::{ApiError, NotFoundExt};
use crate::helpers::retry::{retry_until, Backoff};
use crate::helpers::schema::{self, Computed, OptionalComputed, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{owned, validate};
use crate::resource::{compute, AzureAdapter, Context};
use crate::sdk::graph::{Application, ApplicationsClient};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzureAdApplicationState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub homepage: ValueString<'a>,
    pub identifier_uris: ValueList<ValueString<'a>>,
    pub reply_urls: ValueList<ValueString<'a>>,
    pub available_to_other_tenants: ValueBool,
    pub oauth2_allow_implicit_flow: ValueBool,
    pub application_id: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(AzureAdApplicationState);

#[derive(Debug, Default, Clone, Copy)]
pub struct AzureAdApplication;

fn expand_list(list: &ValueList<ValueString>) -> Vec<String> {
    list.iter()
        .flatten()
        .filter_map(|item| item.as_deref_option())
        .map(str::to_owned)
        .collect()
}

fn flatten_list<'a>(list: Option<Vec<String>>) -> ValueList<ValueString<'a>> {
    Value::Value(
        list.unwrap_or_default()
            .into_iter()
            .map(|item| Value::Value(Cow::Owned(item)))
            .collect(),
    )
}

fn expand_application(state: &AzureAdApplicationState) -> Application {
    Application {
        display_name: state.name.as_deref_option().map(str::to_owned),
        homepage: state.homepage.as_deref_option().map(str::to_owned),
        identifier_uris: Some(expand_list(&state.identifier_uris)),
        reply_urls: Some(expand_list(&state.reply_urls)),
        available_to_other_tenants: Some(
            state.available_to_other_tenants.as_ref_option().copied().unwrap_or_default(),
        ),
        oauth2_allow_implicit_flow: Some(
            state.oauth2_allow_implicit_flow.as_ref_option().copied().unwrap_or_default(),
        ),
        ..Default::default()
    }
}

/// `http://{name}` unless a homepage is configured
fn plan_homepage(planned: &mut AzureAdApplicationState) {
    if !planned.homepage.is_null() {
        return;
    }
    planned.homepage = match &planned.name {
        Value::Value(name) => Value::Value(Cow::Owned(format!("http://{name}"))),
        _ => Value::Unknown,
    };
}

#[async_trait]
impl AzureAdapter for AzureAdApplication {
    type State<'a> = AzureAdApplicationState<'a>;

    const NAME: &'static str = "azurerm_azuread_application";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Display name of the application"),
                    "homepage" => schema::string(OptionalComputed, "Url of the home page, defaults to http://{name}"),
                    "identifier_uris" => schema::string_list(OptionalComputed, "User-defined URIs identifying the application"),
                    "reply_urls" => schema::string_list(OptionalComputed, "Urls where tokens are sent after sign in"),
                    "available_to_other_tenants" => schema::boolean(OptionalComputed, "Whether the application is multi-tenant"),
                    "oauth2_allow_implicit_flow" => schema::boolean(OptionalComputed, "Whether the OAuth2 implicit flow is allowed"),
                    "application_id" => schema::string(Computed, "Application (client) ID"),
                },
                description: Description::plain("Application registered in Azure Active Directory"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::not_empty(diags, AttributePath::new("name"), &config.name);
        validate::not_empty(diags, AttributePath::new("homepage"), &config.homepage);
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        plan_homepage(planned);
        compute(&mut planned.identifier_uris);
        compute(&mut planned.reply_urls);
        if planned.available_to_other_tenants.is_null() {
            planned.available_to_other_tenants = Value::Value(false);
        }
        if planned.oauth2_allow_implicit_flow.is_null() {
            planned.oauth2_allow_implicit_flow = Value::Value(false);
        }
        compute(&mut planned.application_id);
    }

    fn plan_update<'a>(&self, prior: &Self::State<'a>, planned: &mut Self::State<'a>) {
        planned.application_id = prior.application_id.clone();
    }

    fn replace_triggers<'a>(
        &self,
        _prior: &Self::State<'a>,
        _planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        Vec::new()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        let name = planned.name.as_str().to_owned();
        let applications = ApplicationsClient::new(&ctx.client);

        let created = applications
            .create(&expand_application(&planned))
            .await
            .with_context(|| format!("creating Application {name:?}"))?;
        let object_id = created
            .object_id
            .ok_or_else(|| anyhow!("Application {name:?} has no object ID"))?;
        debug!(%name, %object_id, "application created");

        // Graph replication: the new object is not visible everywhere at once
        retry_until(ctx.deadline, Backoff::default(), ApiError::is_not_found, || {
            applications.get(&object_id)
        })
        .await
        .with_context(|| format!("waiting for Application {name:?} to be visible"))?;

        let mut state = planned;
        state.id = Value::Value(Cow::Owned(object_id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Application {name:?} disappeared after creation"))
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let object_id = state.id.as_str();

        let Some(application) = ApplicationsClient::new(&ctx.client)
            .get(object_id)
            .await
            .found()
            .with_context(|| format!("retrieving Application with ID {object_id:?}"))?
        else {
            return Ok(None);
        };

        Ok(Some(AzureAdApplicationState {
            id: state.id.clone(),
            name: owned(application.display_name.as_deref()),
            homepage: owned(application.homepage.as_deref()),
            identifier_uris: flatten_list(application.identifier_uris),
            reply_urls: flatten_list(application.reply_urls),
            available_to_other_tenants: application.available_to_other_tenants.into(),
            oauth2_allow_implicit_flow: application.oauth2_allow_implicit_flow.into(),
            application_id: owned(application.app_id.as_deref()),
            timeouts: state.timeouts,
        }))
    }

    async fn update<'a>(
        &self,
        ctx: &Context,
        prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let object_id = prior.id.as_str().to_owned();

        ApplicationsClient::new(&ctx.client)
            .patch(&object_id, &expand_application(&planned))
            .await
            .with_context(|| format!("patching Azure AD Application with ID {object_id:?}"))?;

        let mut state = planned;
        state.id = prior.id;
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Application {object_id:?} disappeared after update"))
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let object_id = state.id.as_str();

        ApplicationsClient::new(&ctx.client)
            .delete(object_id)
            .await
            .found()
            .with_context(|| format!("deleting Application with object ID {object_id:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homepage_defaults_to_name() {
        let mut planned = AzureAdApplicationState {
            name: Value::Value(Cow::Borrowed("acctest")),
            ..Default::default()
        };
        AzureAdApplication.plan_create(&mut planned);
        assert_eq!(planned.homepage, Value::Value(Cow::Borrowed("http://acctest")));
        assert_eq!(planned.application_id, Value::Unknown);
        assert_eq!(planned.available_to_other_tenants, Value::Value(false));

        let mut planned = AzureAdApplicationState {
            name: Value::Value(Cow::Borrowed("acctest")),
            homepage: Value::Value(Cow::Borrowed("http://homepage-acctest")),
            ..Default::default()
        };
        AzureAdApplication.plan_create(&mut planned);
        assert_eq!(planned.homepage, Value::Value(Cow::Borrowed("http://homepage-acctest")));
    }

    #[test]
    fn body_sends_empty_lists() {
        let state = AzureAdApplicationState {
            name: Value::Value(Cow::Borrowed("acctest")),
            reply_urls: Value::Value(vec![Value::Value(Cow::Borrowed("http://replyurl"))]),
            ..Default::default()
        };
        let body = expand_application(&state);
        assert_eq!(body.identifier_uris, Some(vec![]));
        assert_eq!(body.reply_urls, Some(vec!["http://replyurl".to_owned()]));
        assert_eq!(body.available_to_other_tenants, Some(false));
    }

    #[test]
    fn update_keeps_application_id_and_sends_planned_lists() {
        let urls = |items: &[&'static str]| {
            Value::Value(
                items
                    .iter()
                    .map(|item| Value::Value(Cow::Borrowed(*item)))
                    .collect(),
            )
        };
        let prior = AzureAdApplicationState {
            id: Value::Value(Cow::Borrowed("00000000-0000-0000-0000-000000000001")),
            name: Value::Value(Cow::Borrowed("acctest")),
            homepage: Value::Value(Cow::Borrowed("http://acctest")),
            identifier_uris: urls(&["http://acctest.example"]),
            reply_urls: urls(&["http://replyurl"]),
            available_to_other_tenants: Value::Value(false),
            oauth2_allow_implicit_flow: Value::Value(false),
            application_id: Value::Value(Cow::Borrowed("00000000-0000-0000-0000-000000000002")),
            ..Default::default()
        };
        let mut planned = AzureAdApplicationState {
            reply_urls: urls(&["http://replyurl", "http://replyurl2"]),
            oauth2_allow_implicit_flow: Value::Value(true),
            application_id: Value::Unknown,
            ..prior.clone()
        };
        AzureAdApplication.plan_update(&prior, &mut planned);
        assert_eq!(planned.application_id, prior.application_id);

        let body = expand_application(&planned);
        assert_eq!(body.identifier_uris, Some(vec!["http://acctest.example".to_owned()]));
        assert_eq!(
            body.reply_urls,
            Some(vec!["http://replyurl".to_owned(), "http://replyurl2".to_owned()])
        );
        assert_eq!(body.oauth2_allow_implicit_flow, Some(true));
        assert_eq!(flatten_list(body.reply_urls), planned.reply_urls);
    }
}
