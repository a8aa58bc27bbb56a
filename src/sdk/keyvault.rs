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
use url::Url;

use crate::client::{ApiError, ArmClient, Audience};

pub const API_VERSION: &str = "2016-10-01";

pub const KEY_TYPES: &[&str] = &["EC", "RSA", "RSA-HSM"];
pub const KEY_OPERATIONS: &[&str] = &["decrypt", "encrypt", "sign", "unwrapKey", "verify", "wrapKey"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyCreateParameters {
    pub kty: String,
    #[serde(rename = "key_size", skip_serializing_if = "Option::is_none")]
    pub key_size: Option<i64>,
    pub key_ops: Vec<String>,
    pub attributes: KeyAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyUpdateParameters {
    pub key_ops: Vec<String>,
    pub attributes: KeyAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub key_ops: Option<Vec<String>>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyBundle {
    #[serde(default)]
    pub key: Option<JsonWebKey>,
    #[serde(default)]
    pub attributes: Option<KeyAttributes>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

impl KeyBundle {
    pub fn kid(&self) -> Option<&str> {
        self.key.as_ref()?.kid.as_deref()
    }
}

/// Keys of a vault, addressed through the vault's own url
pub struct KeysClient<'c> {
    client: &'c ArmClient,
}

impl<'c> KeysClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, vault_base_url: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(vault_base_url)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("keys")
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    /// Latest version of a key
    pub async fn get(&self, vault_base_url: &str, name: &str) -> Result<KeyBundle, ApiError> {
        let url = self.url(vault_base_url, &[name])?;
        self.client.get(url, Audience::KeyVault).await
    }

    pub async fn create(
        &self,
        vault_base_url: &str,
        name: &str,
        parameters: &KeyCreateParameters,
    ) -> Result<KeyBundle, ApiError> {
        let url = self.url(vault_base_url, &[name, "create"])?;
        self.client.post(url, Audience::KeyVault, parameters).await
    }

    pub async fn update(
        &self,
        vault_base_url: &str,
        name: &str,
        version: &str,
        parameters: &KeyUpdateParameters,
    ) -> Result<KeyBundle, ApiError> {
        let url = self.url(vault_base_url, &[name, version])?;
        self.client.patch(url, Audience::KeyVault, parameters).await
    }

    pub async fn delete(&self, vault_base_url: &str, name: &str) -> Result<(), ApiError> {
        let url = self.url(vault_base_url, &[name])?;
        self.client.delete(url, Audience::KeyVault).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bundle() {
        let bundle: KeyBundle = serde_json::from_str(
            r#"{"key":{"kid":"https://v.vault.azure.net/keys/k/1","kty":"RSA","key_ops":["sign"],"n":"abc","e":"AQAB"},"attributes":{"enabled":true}}"#,
        )
        .unwrap();
        assert_eq!(bundle.kid(), Some("https://v.vault.azure.net/keys/k/1"));
        assert!(bundle.tags.is_none());
    }
}
