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

#![allow(dead_code)]

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use tf_provider::value::{Value, ValueString};
use url::Url;

use terraform_provider_azurerm::client::{ArmClient, Authorizer, Credentials, Environment};
use terraform_provider_azurerm::resource::{ArmResource, AzureAdapter};
use terraform_provider_azurerm::ProviderData;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const TENANT: &str = "11111111-1111-1111-1111-111111111111";

/// Provider data whose client sends every request to `server`
pub fn provider(server: &MockServer) -> Arc<ProviderData> {
    let base = Url::parse(&server.base_url()).unwrap();
    let authorizer = Authorizer::new(
        Credentials::Static {
            token: "test-token".to_owned(),
        },
        base.clone(),
        TENANT,
    );
    let client = ArmClient::new(Environment::single_endpoint(&base), SUBSCRIPTION, authorizer)
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
        .with_data_lake_endpoint(base);
    ProviderData::configured(client)
}

pub fn resource<T: AzureAdapter>(adapter: T, server: &MockServer) -> ArmResource<T> {
    ArmResource::new(adapter, provider(server))
}

/// `/subscriptions/{s}/resourceGroups/{rg}/providers/{rest}`
pub fn arm_path(resource_group: &str, rest: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{resource_group}/providers/{rest}")
}

pub fn string(value: &str) -> ValueString<'static> {
    Value::Value(Cow::Owned(value.to_owned()))
}
