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
use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tf_provider::schema::{Block, Description, NestedBlock, Schema};
use tf_provider::value::{self, Value, ValueBool, ValueList, ValueMap, ValueString};
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
use crate::resource::{compute, AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::insights::{
    AlertRule, AlertRuleResource, AlertRulesClient, RuleAction, RuleCondition, RuleDataSource,
    RuleEmailAction, RuleMetricDataSource, RuleWebhookAction, ThresholdRuleCondition,
    CONDITION_OPERATORS, TIME_AGGREGATIONS, TYPE_KEY,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EmailActionState<'a> {
    pub send_to_service_owners: ValueBool,
    #[serde(borrow = "'a")]
    pub custom_emails: ValueList<ValueString<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WebhookActionState<'a> {
    #[serde(borrow = "'a")]
    pub service_uri: ValueString<'a>,
    pub properties: ValueMap<'a, ValueString<'a>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricAlertRuleState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub location: ValueString<'a>,
    pub description: ValueString<'a>,
    pub enabled: ValueBool,
    pub resource_id: ValueString<'a>,
    pub metric_name: ValueString<'a>,
    pub operator: ValueString<'a>,
    pub threshold: Value<f64>,
    pub period: ValueString<'a>,
    pub aggregation: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub email_action: Value<EmailActionState<'a>>,
    #[serde(with = "value::serde_as_vec")]
    pub webhook_action: Value<WebhookActionState<'a>>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(MetricAlertRuleState);

#[derive(Debug, Default, Clone, Copy)]
pub struct MetricAlertRule;

fn text(value: &ValueString) -> Option<String> {
    value.as_deref_option().map(str::to_owned)
}

fn expand_actions(state: &MetricAlertRuleState) -> Vec<RuleAction> {
    let mut actions = Vec::with_capacity(2);

    if let Value::Value(email) = &state.email_action {
        actions.push(RuleAction::Email(RuleEmailAction {
            send_to_service_owners: email.send_to_service_owners.as_ref_option().copied(),
            custom_emails: Some(
                email
                    .custom_emails
                    .iter()
                    .flatten()
                    .filter_map(text)
                    .collect(),
            ),
        }));
    }

    if let Value::Value(webhook) = &state.webhook_action {
        let properties: HashMap<String, String> = webhook
            .properties
            .iter()
            .flatten()
            .map(|(k, v)| (k.to_string(), v.as_deref_option().unwrap_or_default().to_owned()))
            .collect();
        actions.push(RuleAction::Webhook(RuleWebhookAction {
            service_uri: text(&webhook.service_uri),
            properties: Some(properties),
        }));
    }

    actions
}

fn expand_rule(state: &MetricAlertRuleState) -> AlertRule {
    let condition = ThresholdRuleCondition {
        data_source: Some(RuleDataSource::Metric(RuleMetricDataSource {
            resource_uri: text(&state.resource_id),
            metric_name: text(&state.metric_name),
        })),
        operator: text(&state.operator),
        threshold: state.threshold.as_ref_option().copied(),
        window_size: text(&state.period),
        time_aggregation: text(&state.aggregation),
    };

    AlertRule {
        name: text(&state.name),
        description: text(&state.description),
        is_enabled: Some(state.enabled.as_ref_option().copied().unwrap_or(true)),
        condition: Some(RuleCondition::Threshold(condition)),
        actions: Some(expand_actions(state)),
    }
}

fn flatten_email<'a>(action: RuleEmailAction) -> Value<EmailActionState<'a>> {
    Value::Value(EmailActionState {
        send_to_service_owners: action.send_to_service_owners.into(),
        custom_emails: Value::Value(
            action
                .custom_emails
                .unwrap_or_default()
                .into_iter()
                .map(|email| Value::Value(Cow::Owned(email)))
                .collect(),
        ),
    })
}

fn flatten_webhook<'a>(
    action: RuleWebhookAction,
    prior: &Value<WebhookActionState<'a>>,
) -> Value<WebhookActionState<'a>> {
    let properties: BTreeMap<Cow<'a, str>, ValueString<'a>> = action
        .properties
        .unwrap_or_default()
        .into_iter()
        .filter(|(k, _)| k != TYPE_KEY)
        .map(|(k, v)| (Cow::Owned(k), Value::Value(Cow::Owned(v))))
        .collect();
    let prior_has_properties = matches!(prior, Value::Value(prior) if prior.properties.is_value());
    Value::Value(WebhookActionState {
        service_uri: action.service_uri.map(Cow::Owned).into(),
        properties: if properties.is_empty() && !prior_has_properties {
            Value::Null
        } else {
            Value::Value(properties)
        },
    })
}

/// Copy the remote rule into `state`, keeping the prior casing of case-insensitive fields
fn flatten_rule<'a>(state: &mut MetricAlertRuleState<'a>, prior: &MetricAlertRuleState<'a>, rule: AlertRule) {
    state.description = owned(rule.description.as_deref());
    state.enabled = rule.is_enabled.into();

    if let Some(RuleCondition::Threshold(condition)) = rule.condition {
        state.operator = keep_prior_case(&prior.operator, condition.operator);
        state.threshold = condition.threshold.into();
        state.period = owned(condition.window_size.as_deref());
        state.aggregation = keep_prior_case(&prior.aggregation, condition.time_aggregation);

        if let Some(RuleDataSource::Metric(source)) = condition.data_source {
            state.resource_id = keep_prior_case(&prior.resource_id, source.resource_uri);
            state.metric_name = owned(source.metric_name.as_deref());
        }
    }

    state.email_action = Value::Null;
    state.webhook_action = Value::Null;
    for action in rule.actions.unwrap_or_default() {
        match action {
            RuleAction::Email(email) if state.email_action.is_null() => {
                state.email_action = flatten_email(email);
            }
            RuleAction::Webhook(webhook) if state.webhook_action.is_null() => {
                state.webhook_action = flatten_webhook(webhook, &prior.webhook_action);
            }
            _ => (),
        }
    }
}

impl MetricAlertRule {
    async fn write<'a>(
        &self,
        ctx: &Context,
        state: MetricAlertRuleState<'a>,
        check_existing: bool,
    ) -> Result<MetricAlertRuleState<'a>> {
        let name = state.name.as_str().to_owned();
        let resource_group = state.resource_group_name.as_str().to_owned();
        let rules = AlertRulesClient::new(&ctx.client);

        if check_existing {
            let existing = rules
                .get(&resource_group, &name)
                .await
                .found()
                .with_context(|| {
                    format!("checking for the existence of Metric Alert Rule {name:?} (Resource Group {resource_group:?})")
                })?;
            if let Some(id) = existing.and_then(|existing| existing.id) {
                return Err(RequiresImport::new(Self::NAME, id).into());
            }
        }

        let rule = AlertRuleResource {
            name: Some(name.clone()),
            location: Some(normalize_location(state.location.as_str())),
            tags: Some(tags::expand(&state.tags)),
            properties: Some(expand_rule(&state)),
            ..Default::default()
        };
        rules
            .create_or_update(&resource_group, &name, &rule)
            .await
            .with_context(|| {
                format!("creating/updating Metric Alert Rule {name:?} (Resource Group {resource_group:?})")
            })?;

        let created = rules.get(&resource_group, &name).await.with_context(|| {
            format!("retrieving Metric Alert Rule {name:?} (Resource Group {resource_group:?})")
        })?;
        let id = created.id.ok_or_else(|| {
            anyhow!("cannot read AzureRM Alert Rule {name:?} (Resource Group {resource_group:?}) ID")
        })?;

        let mut state = state;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Metric Alert Rule {name:?} disappeared after being written"))
    }
}

#[async_trait]
impl AzureAdapter for MetricAlertRule {
    type State<'a> = MetricAlertRuleState<'a>;

    const NAME: &'static str = "azurerm_metric_alertrule";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the alert rule"),
                    "resource_group_name" => schema::resource_group_name(),
                    "location" => schema::location(),
                    "description" => schema::string(OptionalComputed, "Description of the alert rule"),
                    "enabled" => schema::boolean(OptionalComputed, "Whether the alert rule is enabled, defaults to true"),
                    "resource_id" => schema::string(Required, "ID of the monitored resource"),
                    "metric_name" => schema::string(Required, "Metric compared to the threshold"),
                    "operator" => schema::string(Required, "GreaterThan, GreaterThanOrEqual, LessThan or LessThanOrEqual"),
                    "threshold" => schema::number(Required, "Threshold triggering the alert"),
                    "period" => schema::string(Required, "ISO-8601 window over which the metric is aggregated"),
                    "aggregation" => schema::string(Required, "Average, Last, Maximum, Minimum or Total"),
                    "tags" => tags::schema(),
                },
                blocks: map! {
                    "email_action" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "send_to_service_owners" => schema::boolean(Optional, "Email the owners of the monitored resource"),
                            "custom_emails" => schema::string_list(Optional, "Additional recipients"),
                        },
                        ..Default::default()
                    }),
                    "webhook_action" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "service_uri" => schema::string(Required, "Url called when the alert fires"),
                            "properties" => schema::string_map(Optional, "Properties sent with the call"),
                        },
                        ..Default::default()
                    }),
                },
                description: Description::plain("Classic metric alert rule"),
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
            AttributePath::new("operator"),
            &config.operator,
            CONDITION_OPERATORS,
            true,
        );
        validate::string_in_slice(
            diags,
            AttributePath::new("aggregation"),
            &config.aggregation,
            TIME_AGGREGATIONS,
            true,
        );
        validate::iso8601_duration(diags, AttributePath::new("period"), &config.period);
        if let Value::Value(webhook) = &config.webhook_action {
            validate::not_empty(
                diags,
                AttributePath::new("webhook_action").index(0).attribute("service_uri"),
                &webhook.service_uri,
            );
        }
        tags::validate(diags, AttributePath::new("tags"), &config.tags);
        tags::validate_reserved(diags, AttributePath::new("tags"), &config.tags, &[TYPE_KEY]);
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        compute(&mut planned.description);
        if planned.enabled.is_null() {
            planned.enabled = Value::Value(true);
        }
    }

    fn plan_update<'a>(&self, _prior: &Self::State<'a>, planned: &mut Self::State<'a>) {
        if planned.enabled.is_null() {
            planned.enabled = Value::Value(true);
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
            .location("location", &prior.location, &planned.location)
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
        let name = id.segment_ignore_case("alertrules")?;

        let Some(remote) = AlertRulesClient::new(&ctx.client)
            .get(&id.resource_group, name)
            .await
            .found()
            .with_context(|| format!("making Read request on AzureRM Metric Alert Rule {name:?}"))?
        else {
            return Ok(None);
        };

        let mut read = MetricAlertRuleState {
            id: state.id.clone(),
            name: owned(Some(name)),
            resource_group_name: keep_prior_case(
                &state.resource_group_name,
                Some(id.resource_group.clone()),
            ),
            location: keep_prior_location(&state.location, remote.location),
            tags: tags::flatten_filtered(remote.tags, &state.tags, &[TYPE_KEY]),
            ..state.clone()
        };
        if let Some(rule) = remote.properties {
            flatten_rule(&mut read, &state, rule);
        }
        Ok(Some(read))
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
        let name = id.segment_ignore_case("alertrules")?;

        AlertRulesClient::new(&ctx.client)
            .delete(&id.resource_group, name)
            .await
            .found()
            .with_context(|| {
                format!(
                    "deleting Metric Alert Rule {name:?} (resource group {:?})",
                    id.resource_group
                )
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cpu_rule() -> MetricAlertRuleState<'static> {
        MetricAlertRuleState {
            name: Value::Value(Cow::Borrowed("cpu")),
            resource_group_name: Value::Value(Cow::Borrowed("rg")),
            location: Value::Value(Cow::Borrowed("westeurope")),
            description: Value::Value(Cow::Borrowed("CPU above 80%")),
            enabled: Value::Value(true),
            resource_id: Value::Value(Cow::Borrowed("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm")),
            metric_name: Value::Value(Cow::Borrowed("Percentage CPU")),
            operator: Value::Value(Cow::Borrowed("GreaterThan")),
            threshold: Value::Value(80.0),
            period: Value::Value(Cow::Borrowed("PT5M")),
            aggregation: Value::Value(Cow::Borrowed("Average")),
            webhook_action: Value::Value(WebhookActionState {
                service_uri: Value::Value(Cow::Borrowed("https://example.com/alert")),
                properties: Value::Null,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn threshold_rule_reads_back() {
        let state = cpu_rule();
        let json = serde_json::to_value(expand_rule(&state)).unwrap();
        let mut remote: AlertRule = serde_json::from_value(json).unwrap();
        if let Some(RuleAction::Webhook(webhook)) = remote.actions.as_mut().and_then(|a| a.first_mut()) {
            webhook
                .properties
                .get_or_insert_with(HashMap::new)
                .insert(TYPE_KEY.to_owned(), "Microsoft.WindowsAzure.Management.Common.Storage.CasePreservedDictionary".to_owned());
        }

        let mut read = state.clone();
        flatten_rule(&mut read, &state, remote);
        assert_eq!(read.operator, state.operator);
        assert_eq!(read.threshold, state.threshold);
        assert_eq!(read.period, state.period);
        assert_eq!(read.aggregation, state.aggregation);
        assert_eq!(read.resource_id, state.resource_id);
        assert_eq!(read.metric_name, state.metric_name);
        assert_eq!(read.webhook_action, state.webhook_action);
        assert_eq!(read.email_action, Value::Null);
    }

    #[test]
    fn operator_keeps_configured_case() {
        let mut prior = cpu_rule();
        prior.operator = Value::Value(Cow::Borrowed("greaterthan"));
        let remote = expand_rule(&cpu_rule());
        let mut read = prior.clone();
        flatten_rule(&mut read, &prior, remote);
        assert_eq!(read.operator, Value::Value(Cow::Borrowed("greaterthan")));
    }

    #[test]
    fn reserved_tag_is_rejected() {
        let mut config = cpu_rule();
        config.tags = Value::Value(
            [(Cow::Borrowed("$type"), Value::Value(Cow::Borrowed("x")))]
                .into_iter()
                .collect(),
        );
        let mut diags = Diagnostics::default();
        MetricAlertRule.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn invalid_period_and_operator() {
        let mut config = cpu_rule();
        config.period = Value::Value(Cow::Borrowed("5 minutes"));
        config.operator = Value::Value(Cow::Borrowed("Equals"));
        let mut diags = Diagnostics::default();
        MetricAlertRule.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn enabled_defaults_to_true() {
        let mut planned = MetricAlertRuleState::default();
        MetricAlertRule.plan_create(&mut planned);
        assert_eq!(planned.enabled, Value::Value(true));
        assert_eq!(planned.description, Value::Unknown);
    }
}
