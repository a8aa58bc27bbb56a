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

//! Logging to stderr, which Terraform collects from its plugins

use std::env;

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter directives, e.g. `debug` or `terraform_provider_azurerm=trace`
pub const FILTER_VARIABLE: &str = "TF_LOG_PROVIDER_AZURERM";
/// `json` switches to one JSON object per line
pub const FORMAT_VARIABLE: &str = "TF_LOG_PROVIDER_AZURERM_FORMAT";

const DEFAULT_FILTER: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_VARIABLE).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// When `PLUGIN_LOG_FILE` is set the plugin server installs its own file
/// subscriber, so nothing is done here.
pub fn init() -> Result<()> {
    if env::var_os("PLUGIN_LOG_FILE").is_some() {
        return Ok(());
    }

    let json = env::var(FORMAT_VARIABLE).is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter())
        .with(layer)
        .try_init()
        .map_err(|err| anyhow!("cannot initialize logging: {err}"))
}
