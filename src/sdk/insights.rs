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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::client::{ApiError, ArmClient, Audience};

use super::resource_path;

pub const API_VERSION: &str = "2016-03-01";

pub const CONDITION_OPERATORS: &[&str] =
    &["GreaterThan", "GreaterThanOrEqual", "LessThan", "LessThanOrEqual"];
pub const TIME_AGGREGATIONS: &[&str] = &["Average", "Last", "Maximum", "Minimum", "Total"];

/// Tag key Azure adds to alert rules and webhook properties
pub const TYPE_KEY: &str = "$type";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertRuleResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub properties: Option<AlertRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<RuleAction>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "odata.type")]
pub enum RuleCondition {
    #[serde(rename = "Microsoft.Azure.Management.Insights.Models.ThresholdRuleCondition")]
    Threshold(ThresholdRuleCondition),
    /// Location or management event conditions, not managed here
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRuleCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<RuleDataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_aggregation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "odata.type")]
pub enum RuleDataSource {
    #[serde(rename = "Microsoft.Azure.Management.Insights.Models.RuleMetricDataSource")]
    Metric(RuleMetricDataSource),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetricDataSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "odata.type")]
pub enum RuleAction {
    #[serde(rename = "Microsoft.Azure.Management.Insights.Models.RuleEmailAction")]
    Email(RuleEmailAction),
    #[serde(rename = "Microsoft.Azure.Management.Insights.Models.RuleWebhookAction")]
    Webhook(RuleWebhookAction),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEmailAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_to_service_owners: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_emails: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWebhookAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

/// Classic metric alert rules of a resource group
pub struct AlertRulesClient<'c> {
    client: &'c ArmClient,
}

impl<'c> AlertRulesClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, resource_group: &str, name: &str) -> Result<url::Url, ApiError> {
        let path = resource_path(
            self.client,
            resource_group,
            "microsoft.insights",
            &[("alertrules", name)],
        );
        self.client.resource_manager_url(&path, API_VERSION)
    }

    pub async fn get(&self, resource_group: &str, name: &str) -> Result<AlertRuleResource, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.get(url, Audience::ResourceManager).await
    }

    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        rule: &AlertRuleResource,
    ) -> Result<AlertRuleResource, ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.put(url, Audience::ResourceManager, rule).await
    }

    pub async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ApiError> {
        let url = self.url(resource_group, name)?;
        self.client.delete(url, Audience::ResourceManager).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn polymorphic_rule() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/microsoft.insights/alertrules/cpu",
            "name": "cpu",
            "location": "westeurope",
            "tags": {"$type": "Microsoft.WindowsAzure.Management.Common.Storage.CasePreservedDictionary"},
            "properties": {
                "name": "cpu",
                "isEnabled": true,
                "condition": {
                    "odata.type": "Microsoft.Azure.Management.Insights.Models.ThresholdRuleCondition",
                    "dataSource": {
                        "odata.type": "Microsoft.Azure.Management.Insights.Models.RuleMetricDataSource",
                        "resourceUri": "/subscriptions/s/vm",
                        "metricName": "Percentage CPU"
                    },
                    "operator": "GreaterThan",
                    "threshold": 80.0,
                    "windowSize": "PT5M",
                    "timeAggregation": "Average"
                },
                "actions": [
                    {
                        "odata.type": "Microsoft.Azure.Management.Insights.Models.RuleWebhookAction",
                        "serviceUri": "https://example.com/hook",
                        "properties": {"$type": "x", "env": "prod"}
                    },
                    {"odata.type": "Microsoft.Azure.Management.Insights.Models.SomethingElse"}
                ]
            }
        });
        let rule: AlertRuleResource = serde_json::from_value(body).unwrap();
        let properties = rule.properties.unwrap();
        let Some(RuleCondition::Threshold(condition)) = properties.condition else {
            panic!("threshold condition expected");
        };
        assert_eq!(condition.threshold, Some(80.0));
        assert_eq!(
            condition.data_source,
            Some(RuleDataSource::Metric(RuleMetricDataSource {
                resource_uri: Some("/subscriptions/s/vm".to_owned()),
                metric_name: Some("Percentage CPU".to_owned()),
            }))
        );
        let actions = properties.actions.unwrap();
        assert!(matches!(actions[0], RuleAction::Webhook(_)));
        assert_eq!(actions[1], RuleAction::Unsupported);
    }

    #[test]
    fn condition_is_tagged() {
        let condition = RuleCondition::Threshold(ThresholdRuleCondition {
            operator: Some("LessThan".to_owned()),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&condition).unwrap(),
            json!({
                "odata.type": "Microsoft.Azure.Management.Insights.Models.ThresholdRuleCondition",
                "operator": "LessThan"
            })
        );
    }
}
