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

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};

use terraform_provider_azurerm::resources::traffic_manager_profile::{
    DnsConfigState, MonitorConfigState,
};
use terraform_provider_azurerm::resources::TrafficManagerProfile;

mod common;
use common::{arm_path, resource, string};

fn profile_path() -> String {
    arm_path("acctestRG", "Microsoft.Network/trafficManagerProfiles/acctesttmp")
}

#[tokio::test]
async fn imported_profile_reads_its_blocks() {
    let server = MockServer::start_async().await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(profile_path())
                .query_param("api-version", "2017-05-01");
            then.status(200).json_body(json!({
                "id": profile_path(),
                "name": "acctesttmp",
                "type": "Microsoft.Network/trafficManagerProfiles",
                "location": "global",
                "tags": {"environment": "Production"},
                "properties": {
                    "profileStatus": "Enabled",
                    "trafficRoutingMethod": "Weighted",
                    "dnsConfig": {
                        "relativeName": "acctesttmp",
                        "fqdn": "acctesttmp.trafficmanager.net",
                        "ttl": 30
                    },
                    "monitorConfig": {
                        "profileMonitorStatus": "Inactive",
                        "protocol": "HTTPS",
                        "port": 443,
                        "path": "/health"
                    },
                    "endpoints": []
                }
            }));
        })
        .await;

    let profile = resource(TrafficManagerProfile, &server);
    let mut diags = Diagnostics::default();
    let (imported, _) = profile
        .import(&mut diags, profile_path())
        .await
        .expect("profile is imported");

    assert!(diags.errors.is_empty(), "{diags:?}");
    get.assert_async().await;
    assert_eq!(imported.name, string("acctesttmp"));
    assert_eq!(imported.resource_group_name, string("acctestRG"));
    assert_eq!(imported.traffic_routing_method, string("Weighted"));
    assert_eq!(imported.fqdn, string("acctesttmp.trafficmanager.net"));
    assert_eq!(
        imported.dns_config,
        Value::Value(vec![Value::Value(DnsConfigState {
            relative_name: string("acctesttmp"),
            ttl: Value::Value(30),
        })])
    );
    assert_eq!(
        imported.monitor_config,
        Value::Value(vec![Value::Value(MonitorConfigState {
            protocol: string("HTTPS"),
            port: Value::Value(443),
            path: string("/health"),
        })])
    );
}

#[tokio::test]
async fn importing_a_missing_profile_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(profile_path());
            then.status(404);
        })
        .await;

    let profile = resource(TrafficManagerProfile, &server);
    let mut diags = Diagnostics::default();
    let imported = profile.import(&mut diags, profile_path()).await;

    assert!(imported.is_none());
    assert_eq!(diags.errors.len(), 1);
    assert_eq!(diags.errors[0].summary, "Cannot import non-existent remote object");
}
