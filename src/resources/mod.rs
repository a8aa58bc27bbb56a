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

//! Adapters of the supported Azure resources

pub(crate) mod loadbalancer;
pub(crate) mod logic_app;

pub mod azuread_application;
pub mod data_lake_store_file;
pub mod dns_aaaa_record;
pub mod eventhub_consumer_group;
pub mod key_vault_key;
pub mod lb_nat_rule;
pub mod lb_rule;
pub mod log_analytics_solution;
pub mod logic_app_trigger_recurrence;
pub mod metric_alertrule;
pub mod role_assignment;
pub mod scheduler_job_collection;
pub mod traffic_manager_profile;

pub use azuread_application::AzureAdApplication;
pub use data_lake_store_file::DataLakeStoreFile;
pub use dns_aaaa_record::DnsAaaaRecord;
pub use eventhub_consumer_group::EventHubConsumerGroup;
pub use key_vault_key::KeyVaultKey;
pub use lb_nat_rule::LbNatRule;
pub use lb_rule::LbRule;
pub use log_analytics_solution::LogAnalyticsSolution;
pub use logic_app_trigger_recurrence::LogicAppTriggerRecurrence;
pub use metric_alertrule::MetricAlertRule;
pub use role_assignment::RoleAssignment;
pub use scheduler_job_collection::SchedulerJobCollection;
pub use traffic_manager_profile::TrafficManagerProfile;
