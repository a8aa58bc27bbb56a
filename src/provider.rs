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
use std::env;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{ValueEmpty, ValueString};
use tf_provider::{
    map, AttributePath, Diagnostics, DynamicDataSource, DynamicResource, Provider,
};

use crate::client::{ArmClient, Authorizer, Credentials, Environment};
use crate::helpers::locks::KeyedLocks;
use crate::resource::ArmResource;
use crate::resources::{
    AzureAdApplication, DataLakeStoreFile, DnsAaaaRecord, EventHubConsumerGroup, KeyVaultKey,
    LbNatRule, LbRule, LogAnalyticsSolution, LogicAppTriggerRecurrence, MetricAlertRule,
    RoleAssignment, SchedulerJobCollection, TrafficManagerProfile,
};

/// State shared by the provider and its resources
///
/// Resources are instantiated before the provider is configured, so the client
/// is only filled in by [`Provider::configure`].
#[derive(Debug, Default)]
pub struct ProviderData {
    client: OnceLock<Arc<ArmClient>>,
    locks: Arc<KeyedLocks>,
}

impl ProviderData {
    /// Provider data with an already configured client
    pub fn configured(client: ArmClient) -> Arc<Self> {
        let data = Self::default();
        let _ = data.client.set(Arc::new(client));
        Arc::new(data)
    }

    pub fn client(&self) -> Option<Arc<ArmClient>> {
        self.client.get().cloned()
    }

    pub fn locks(&self) -> Arc<KeyedLocks> {
        self.locks.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub subscription_id: ValueString<'a>,
    pub client_id: ValueString<'a>,
    pub client_secret: ValueString<'a>,
    pub tenant_id: ValueString<'a>,
    pub environment: ValueString<'a>,
}

/// Configuration value, falling back to an environment variable
fn setting(value: &ValueString, variable: &str) -> Option<String> {
    value
        .as_deref_option()
        .map(str::to_owned)
        .or_else(|| env::var(variable).ok())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Clone)]
pub struct AzureRmProvider {
    data: Arc<ProviderData>,
}

impl AzureRmProvider {
    pub fn new(data: Arc<ProviderData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Provider for AzureRmProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let setting = |description: &str, sensitive: bool| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Optional,
            sensitive,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "subscription_id" => setting("Subscription ID (ARM_SUBSCRIPTION_ID)", false),
                    "client_id" => setting("Client ID of the service principal (ARM_CLIENT_ID)", false),
                    "client_secret" => setting("Client secret of the service principal (ARM_CLIENT_SECRET)", true),
                    "tenant_id" => setting("Tenant ID (ARM_TENANT_ID)", false),
                    "environment" => setting("Cloud environment: public, usgovernment, german or china (ARM_ENVIRONMENT)", false),
                },
                description: Description::plain("Azure Resource Manager"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        if let Some(environment) = config.environment.as_deref_option() {
            if Environment::from_name(environment).is_err() {
                diags.error(
                    "Unknown environment",
                    format!(
                        "expected one of {:?}, got {environment:?}",
                        Environment::NAMES
                    ),
                    AttributePath::new("environment"),
                );
            }
        }
        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let mut required = |value: &ValueString, name: &'static str, variable: &str| {
            let value = setting(value, variable);
            if value.is_none() {
                diags.error(
                    format!("Missing {name}"),
                    format!("set {name} in the provider block or the {variable} environment variable"),
                    AttributePath::new(name),
                );
            }
            value
        };

        let subscription_id = required(&config.subscription_id, "subscription_id", "ARM_SUBSCRIPTION_ID");
        let client_id = required(&config.client_id, "client_id", "ARM_CLIENT_ID");
        let client_secret = required(&config.client_secret, "client_secret", "ARM_CLIENT_SECRET");
        let tenant_id = required(&config.tenant_id, "tenant_id", "ARM_TENANT_ID");
        let environment = setting(&config.environment, "ARM_ENVIRONMENT").unwrap_or_default();

        let (Some(subscription_id), Some(client_id), Some(client_secret), Some(tenant_id)) =
            (subscription_id, client_id, client_secret, tenant_id)
        else {
            return None;
        };

        let client = Environment::from_name(&environment).and_then(|environment| {
            let authorizer = Authorizer::new(
                Credentials::ClientSecret {
                    client_id,
                    client_secret,
                },
                environment.active_directory.clone(),
                tenant_id,
            );
            ArmClient::new(environment, subscription_id, authorizer)
        });
        let client = match client {
            Ok(client) => client,
            Err(err) => {
                diags.root_error("Cannot configure the Azure client", err.to_string());
                return None;
            }
        };

        info!(
            terraform_version = %terraform_version,
            environment = client.environment().name,
            subscription_id = client.subscription_id(),
            "provider configured"
        );
        if self.data.client.set(Arc::new(client)).is_err() {
            warn!("provider configured twice, keeping the first configuration");
        }
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        let data = &self.data;
        Some(map! {
            "azuread_application" => ArmResource::new(AzureAdApplication, data.clone()),
            "data_lake_store_file" => ArmResource::new(DataLakeStoreFile, data.clone()),
            "dns_aaaa_record" => ArmResource::new(DnsAaaaRecord, data.clone()),
            "eventhub_consumer_group" => ArmResource::new(EventHubConsumerGroup, data.clone()),
            "key_vault_key" => ArmResource::new(KeyVaultKey, data.clone()),
            "lb_nat_rule" => ArmResource::new(LbNatRule, data.clone()),
            "lb_rule" => ArmResource::new(LbRule, data.clone()),
            "log_analytics_solution" => ArmResource::new(LogAnalyticsSolution, data.clone()),
            "logic_app_trigger_recurrence" => ArmResource::new(LogicAppTriggerRecurrence, data.clone()),
            "metric_alertrule" => ArmResource::new(MetricAlertRule, data.clone()),
            "role_assignment" => ArmResource::new(RoleAssignment, data.clone()),
            "scheduler_job_collection" => ArmResource::new(SchedulerJobCollection, data.clone()),
            "traffic_manager_profile" => ArmResource::new(TrafficManagerProfile, data.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(HashMap::new())
    }
}
