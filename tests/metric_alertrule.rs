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
use std::collections::BTreeMap;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};

use terraform_provider_azurerm::resources::metric_alertrule::{
    MetricAlertRuleState, WebhookActionState,
};
use terraform_provider_azurerm::resources::MetricAlertRule;

mod common;
use common::{arm_path, resource, string};

fn rule_path() -> String {
    arm_path("acctestRG", "microsoft.insights/alertrules/cpu-high")
}

fn vm_id() -> String {
    arm_path("acctestRG", "Microsoft.Compute/virtualMachines/acctvm")
}

fn planned() -> MetricAlertRuleState<'static> {
    MetricAlertRuleState {
        id: string(&rule_path()),
        name: string("cpu-high"),
        resource_group_name: string("acctestRG"),
        location: string("West Europe"),
        description: string("CPU above 80%"),
        enabled: Value::Value(true),
        resource_id: string(&vm_id()),
        metric_name: string("Percentage CPU"),
        operator: string("GreaterThan"),
        threshold: Value::Value(80.0),
        period: string("PT5M"),
        aggregation: string("Average"),
        webhook_action: Value::Value(WebhookActionState {
            service_uri: string("https://example.com/some-url"),
            properties: Value::Value(BTreeMap::from([(
                Cow::Borrowed("severity"),
                string("incredible"),
            )])),
        }),
        ..Default::default()
    }
}

fn remote() -> serde_json::Value {
    json!({
        "id": rule_path(),
        "name": "cpu-high",
        "type": "Microsoft.Insights/alertRules",
        "location": "westeurope",
        "tags": {
            "$type": "Microsoft.WindowsAzure.Management.Common.Storage.CasePreservedDictionary, Microsoft.WindowsAzure.Management.Common.Storage"
        },
        "properties": {
            "name": "cpu-high",
            "description": "CPU above 80%",
            "isEnabled": true,
            "condition": {
                "odata.type": "Microsoft.Azure.Management.Insights.Models.ThresholdRuleCondition",
                "dataSource": {
                    "odata.type": "Microsoft.Azure.Management.Insights.Models.RuleMetricDataSource",
                    "resourceUri": vm_id(),
                    "metricName": "Percentage CPU"
                },
                "operator": "GreaterThan",
                "threshold": 80.0,
                "windowSize": "PT5M",
                "timeAggregation": "Average"
            },
            "actions": [{
                "odata.type": "Microsoft.Azure.Management.Insights.Models.RuleWebhookAction",
                "serviceUri": "https://example.com/some-url",
                "properties": {
                    "$type": "Microsoft.WindowsAzure.Management.Common.Storage.CasePreservedDictionary`1[[System.String, mscorlib]], Microsoft.WindowsAzure.Management.Common.Storage",
                    "severity": "incredible"
                }
            }]
        }
    })
}

#[tokio::test]
async fn threshold_rule_with_webhook_round_trips() {
    let server = MockServer::start_async().await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(rule_path())
                .query_param("api-version", "2016-03-01")
                .json_body_partial(
                    r#"{
                        "location": "westeurope",
                        "properties": {
                            "isEnabled": true,
                            "condition": {
                                "odata.type": "Microsoft.Azure.Management.Insights.Models.ThresholdRuleCondition",
                                "operator": "GreaterThan",
                                "threshold": 80.0,
                                "windowSize": "PT5M"
                            }
                        }
                    }"#,
                );
            then.status(200).json_body(remote());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(rule_path());
            then.status(200).json_body(remote());
        })
        .await;

    let alert = resource(MetricAlertRule, &server);
    let mut diags = Diagnostics::default();
    let (updated, _) = alert
        .update(
            &mut diags,
            planned(),
            planned(),
            planned(),
            Default::default(),
            Default::default(),
        )
        .await
        .expect("rule is written");

    assert!(diags.errors.is_empty(), "{diags:?}");
    put.assert_async().await;
    assert_eq!(updated.location, string("West Europe"));
    assert_eq!(updated.operator, string("GreaterThan"));
    assert_eq!(updated.threshold, Value::Value(80.0));
    assert_eq!(updated.period, string("PT5M"));
    assert!(updated.email_action.is_null());
    let Value::Value(webhook) = &updated.webhook_action else {
        panic!("webhook action missing: {updated:?}");
    };
    assert_eq!(webhook.service_uri, string("https://example.com/some-url"));
    assert_eq!(
        webhook.properties,
        Value::Value(BTreeMap::from([(
            Cow::Borrowed("severity"),
            string("incredible"),
        )]))
    );
    assert!(updated.tags.as_ref_option().map_or(true, BTreeMap::is_empty));
}

#[tokio::test]
async fn reserved_tag_is_rejected() {
    let server = MockServer::start_async().await;
    let alert = resource(MetricAlertRule, &server);
    let mut diags = Diagnostics::default();
    let config = MetricAlertRuleState {
        tags: Value::Value(BTreeMap::from([(Cow::Borrowed("$type"), string("custom"))])),
        ..planned()
    };

    assert!(alert.validate(&mut diags, config).await.is_none());
    assert_eq!(diags.errors.len(), 1, "{diags:?}");
    assert_eq!(diags.errors[0].summary, "Reserved tag name");
}
