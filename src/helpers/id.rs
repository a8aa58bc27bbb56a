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

use thiserror::Error;
use url::Url;

/// Error raised when a stored identifier cannot be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("cannot parse Azure ID {0:?}: {1}")]
    Url(String, String),
    #[error("the number of path segments is not divisible by 2 in {0:?}")]
    OddSegments(String),
    #[error("key/value cannot be empty strings in {id:?}: key {key:?}, value {value:?}")]
    EmptySegment {
        id: String,
        key: String,
        value: String,
    },
    #[error("no subscription ID found in {0:?}")]
    MissingSubscription(String),
    #[error("no resource group name found in {0:?}")]
    MissingResourceGroup(String),
    #[error("ID {id:?} has no {key:?} segment")]
    MissingSegment { id: String, key: String },
    #[error("invalid ID {id:?}: {reason}")]
    Invalid { id: String, reason: String },
}

/// Decoded Resource Manager identifier
///
/// `/subscriptions/{s}/resourceGroups/{rg}/providers/{ns}/{type}/{name}/...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub raw: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    pub path: HashMap<String, String>,
}

impl ResourceId {
    pub fn parse(id: &str) -> Result<Self, IdError> {
        // Parsed as a path relative to a dummy host so that query strings are dropped
        let url = Url::parse("http://azure.invalid")
            .and_then(|base| base.join(id))
            .map_err(|err| IdError::Url(id.to_owned(), err.to_string()))?;
        let path = url.path().trim_matches('/');
        let components: Vec<&str> = path.split('/').collect();

        if components.len() % 2 != 0 {
            return Err(IdError::OddSegments(path.to_owned()));
        }

        let mut subscription_id = None;
        let mut map = HashMap::new();
        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(IdError::EmptySegment {
                    id: path.to_owned(),
                    key: key.to_owned(),
                    value: value.to_owned(),
                });
            }
            let value = decode(id, value)?;
            // a nested "subscriptions" (Service Bus topics) must not shadow the first one
            if key == "subscriptions" && subscription_id.is_none() {
                subscription_id = Some(value);
            } else {
                map.insert(key.to_owned(), value);
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| IdError::MissingSubscription(path.to_owned()))?;
        let resource_group = map
            .remove("resourceGroups")
            .or_else(|| map.remove("resourcegroups"))
            .ok_or_else(|| IdError::MissingResourceGroup(path.to_owned()))?;
        let provider = map.remove("providers");

        Ok(Self {
            raw: id.to_owned(),
            subscription_id,
            resource_group,
            provider,
            path: map,
        })
    }

    /// Value following `key` in the path
    pub fn segment(&self, key: &str) -> Result<&str, IdError> {
        self.path
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| IdError::MissingSegment {
                id: self.raw.clone(),
                key: key.to_owned(),
            })
    }

    /// Value following `key`, ignoring the case of the key
    pub fn segment_ignore_case(&self, key: &str) -> Result<&str, IdError> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| IdError::MissingSegment {
                id: self.raw.clone(),
                key: key.to_owned(),
            })
    }
}

/// Percent-decoded `segment` of `id`
fn decode(id: &str, segment: &str) -> Result<String, IdError> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| IdError::Invalid {
            id: id.to_owned(),
            reason: format!("segment {segment:?} is not valid UTF-8 once decoded: {err}"),
        })
}

/// Identifier of an object nested in a Key Vault: `https://{vault}/{collection}/{name}/{version}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVaultChildId {
    pub vault_base_url: String,
    pub collection: String,
    pub name: String,
    pub version: String,
}

impl KeyVaultChildId {
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let url = Url::parse(id).map_err(|err| IdError::Url(id.to_owned(), err.to_string()))?;
        let components: Vec<&str> = url.path().trim_matches('/').split('/').collect();
        if components.len() != 3 || components.iter().any(|c| c.is_empty()) {
            return Err(IdError::Invalid {
                id: id.to_owned(),
                reason: format!(
                    "Key Vault object IDs have 3 path segments, found {}",
                    components.len()
                ),
            });
        }

        let host = url.host_str().ok_or_else(|| IdError::Invalid {
            id: id.to_owned(),
            reason: "missing host".to_owned(),
        })?;
        let vault_base_url = match url.port() {
            Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
            None => format!("{}://{}/", url.scheme(), host),
        };

        Ok(Self {
            vault_base_url,
            collection: components[0].to_owned(),
            name: components[1].to_owned(),
            version: components[2].to_owned(),
        })
    }
}

/// Identifier of a Data Lake Store file: `{account}.{suffix}{path}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLakeStoreFileId {
    pub account: String,
    pub path: String,
}

impl DataLakeStoreFileId {
    pub fn format(account: &str, suffix: &str, path: &str) -> String {
        format!("{account}.{suffix}{path}")
    }

    pub fn parse(id: &str) -> Result<Self, IdError> {
        let url = Url::parse(&format!("https://{id}"))
            .map_err(|err| IdError::Url(id.to_owned(), err.to_string()))?;
        let host = url.host_str().unwrap_or_default();
        let account = host.split('.').next().unwrap_or_default();
        if account.is_empty() || url.path() == "/" {
            return Err(IdError::Invalid {
                id: id.to_owned(),
                reason: "expected {account}.{suffix}/{path}".to_owned(),
            });
        }
        Ok(Self {
            account: account.to_owned(),
            path: decode(id, url.path())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resource_id() {
        let id = ResourceId::parse(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/acctest/providers/Microsoft.Network/dnszones/example.com/AAAA/www",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.resource_group, "acctest");
        assert_eq!(id.provider.as_deref(), Some("Microsoft.Network"));
        assert_eq!(id.segment("dnszones").unwrap(), "example.com");
        assert_eq!(id.segment("AAAA").unwrap(), "www");
        assert!(id.segment("CNAME").is_err());
    }

    #[test]
    fn lowercase_resource_group_key() {
        let id = ResourceId::parse("/subscriptions/s/resourcegroups/rg/providers/p/solutions/x")
            .unwrap();
        assert_eq!(id.resource_group, "rg");
    }

    #[test]
    fn nested_subscriptions_do_not_override() {
        let id = ResourceId::parse(
            "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.ServiceBus/namespaces/ns/topics/t/subscriptions/s2",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "s1");
        assert_eq!(id.segment("subscriptions").unwrap(), "s2");
    }

    #[test]
    fn malformed_resource_ids() {
        assert!(matches!(
            ResourceId::parse("/subscriptions/s/resourceGroups"),
            Err(IdError::OddSegments(_))
        ));
        assert!(matches!(
            ResourceId::parse("/resourceGroups/rg/providers/p"),
            Err(IdError::MissingSubscription(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions/s/providers/p"),
            Err(IdError::MissingResourceGroup(_))
        ));
        assert!(matches!(
            ResourceId::parse("/subscriptions//resourceGroups/rg"),
            Err(IdError::EmptySegment { .. })
        ));
    }

    #[test]
    fn encoded_segments() {
        let id = ResourceId::parse(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.OperationsManagement/solutions/ContainerInsights%28ws%29",
        )
        .unwrap();
        assert_eq!(id.segment("solutions").unwrap(), "ContainerInsights(ws)");

        let id = ResourceId::parse("/subscriptions/s/resourceGroups/my%20rg/providers/p/zones/z")
            .unwrap();
        assert_eq!(id.resource_group, "my rg");

        assert!(matches!(
            ResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/p/zones/%FF"),
            Err(IdError::Invalid { .. })
        ));
    }

    #[test]
    fn key_vault_child_id() {
        let id = KeyVaultChildId::parse(
            "https://example.vault.azure.net/keys/my-key/0123456789abcdef",
        )
        .unwrap();
        assert_eq!(id.vault_base_url, "https://example.vault.azure.net/");
        assert_eq!(id.collection, "keys");
        assert_eq!(id.name, "my-key");
        assert_eq!(id.version, "0123456789abcdef");

        assert!(KeyVaultChildId::parse("https://example.vault.azure.net/keys/my-key").is_err());
        assert!(KeyVaultChildId::parse("not a url").is_err());
    }

    #[test]
    fn data_lake_file_id() {
        let raw = DataLakeStoreFileId::format("acct", "azuredatalakestore.net", "/dir/file.txt");
        assert_eq!(raw, "acct.azuredatalakestore.net/dir/file.txt");
        let id = DataLakeStoreFileId::parse(&raw).unwrap();
        assert_eq!(id.account, "acct");
        assert_eq!(id.path, "/dir/file.txt");
        assert!(DataLakeStoreFileId::parse("acct.azuredatalakestore.net").is_err());
    }

    #[test]
    fn data_lake_file_id_with_special_characters() {
        for path in ["/dir/my file.txt", "/données/été 2024.csv"] {
            let raw = DataLakeStoreFileId::format("acct", "azuredatalakestore.net", path);
            let id = DataLakeStoreFileId::parse(&raw).unwrap();
            assert_eq!(id.account, "acct");
            assert_eq!(id.path, path);
        }
    }
}
