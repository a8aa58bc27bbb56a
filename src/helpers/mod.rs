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

use thiserror::Error;
use tf_provider::value::{Value, ValueString};

pub mod id;
pub mod locks;
pub mod retry;
pub mod schema;
pub mod tags;
pub mod timeouts;
pub mod validate;

/// Creation was refused because the remote object already exists
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource:?} for more information.")]
pub struct RequiresImport {
    pub resource: &'static str,
    pub id: String,
}

impl RequiresImport {
    pub fn new(resource: &'static str, id: impl Into<String>) -> Self {
        Self {
            resource,
            id: id.into(),
        }
    }
}

/// Canonical form of an Azure location: `West Europe` -> `westeurope`
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Value to store after a read: the remote value, unless the prior value is the
/// same once both are passed through `canon`
pub fn keep_prior<'a, F>(prior: &ValueString<'a>, remote: Option<String>, canon: F) -> ValueString<'a>
where
    F: Fn(&str) -> String,
{
    match (prior, remote) {
        (Value::Value(prior), Some(remote)) if canon(prior) == canon(&remote) => {
            Value::Value(prior.clone())
        }
        (_, remote) => remote.map(Cow::Owned).into(),
    }
}

/// [`keep_prior`] comparing case-insensitively
pub fn keep_prior_case<'a>(prior: &ValueString<'a>, remote: Option<String>) -> ValueString<'a> {
    keep_prior(prior, remote, str::to_lowercase)
}

/// [`keep_prior`] comparing locations
pub fn keep_prior_location<'a>(prior: &ValueString<'a>, remote: Option<String>) -> ValueString<'a> {
    keep_prior(prior, remote, normalize_location)
}

/// Owned copy of a state string
pub fn owned<'a>(value: Option<&str>) -> ValueString<'a> {
    value.map(|v| Cow::Owned(v.to_owned())).into()
}

/// Whether a planned value differs from the prior one
pub fn changed<T: PartialEq>(prior: &Value<T>, planned: &Value<T>) -> bool {
    planned.is_unknown() || prior != planned
}

/// Whether two strings differ once passed through `canon`
pub fn changed_with<F>(prior: &ValueString, planned: &ValueString, canon: F) -> bool
where
    F: Fn(&str) -> String,
{
    match (prior, planned) {
        (Value::Value(a), Value::Value(b)) => canon(a) != canon(b),
        _ => changed(prior, planned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("westeurope"), "westeurope");
    }

    #[test]
    fn prior_casing_is_kept() {
        let prior: ValueString = Value::Value(Cow::Borrowed("Tcp"));
        assert_eq!(keep_prior_case(&prior, Some("TCP".into())), prior);
        assert_eq!(
            keep_prior_case(&prior, Some("Udp".into())),
            Value::Value(Cow::Borrowed("Udp"))
        );
        assert_eq!(keep_prior_case(&prior, None), Value::Null);

        let location: ValueString = Value::Value(Cow::Borrowed("West Europe"));
        assert_eq!(keep_prior_location(&location, Some("westeurope".into())), location);
    }

    #[test]
    fn import_message() {
        let err = RequiresImport::new("azurerm_dns_aaaa_record", "/subscriptions/s/x");
        assert!(err
            .to_string()
            .starts_with("A resource with the ID \"/subscriptions/s/x\" already exists"));
    }

    #[test]
    fn changes() {
        let a: ValueString = Value::Value(Cow::Borrowed("Enabled"));
        let b: ValueString = Value::Value(Cow::Borrowed("enabled"));
        assert!(changed(&a, &b));
        assert!(!changed_with(&a, &b, str::to_lowercase));
        assert!(changed(&a, &Value::Unknown));
    }
}
