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
use std::sync::OnceLock;

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueList, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::KeyVaultChildId;
use crate::helpers::schema::{self, Computed, Required};
use crate::helpers::tags::{self, Tags};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{changed_with, keep_prior, owned, validate, RequiresImport};
use crate::resource::{compute, AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::keyvault::{
    KeyAttributes, KeyCreateParameters, KeyUpdateParameters, KeysClient, KEY_OPERATIONS, KEY_TYPES,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyVaultKeyState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub vault_uri: ValueString<'a>,
    pub key_type: ValueString<'a>,
    pub key_size: ValueNumber,
    pub key_opts: ValueList<ValueString<'a>>,
    pub version: ValueString<'a>,
    pub n: ValueString<'a>,
    pub e: ValueString<'a>,
    pub tags: Tags<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(KeyVaultKeyState);

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyVaultKey;

fn child_name_regex() -> &'static Regex {
    static CHILD_NAME: OnceLock<Regex> = OnceLock::new();
    CHILD_NAME.get_or_init(|| validate::regex(r"^[0-9a-zA-Z-]+$"))
}

fn expand_key_opts(opts: &ValueList<ValueString>) -> Vec<String> {
    opts.iter()
        .flatten()
        .filter_map(|opt| opt.as_deref_option())
        .map(str::to_owned)
        .collect()
}

fn flatten_key_opts<'a>(opts: Option<Vec<String>>) -> ValueList<ValueString<'a>> {
    Value::Value(
        opts.unwrap_or_default()
            .into_iter()
            .map(|opt| Value::Value(Cow::Owned(opt)))
            .collect(),
    )
}

fn trim_slash(uri: &str) -> String {
    uri.trim_end_matches('/').to_owned()
}

#[async_trait]
impl AzureAdapter for KeyVaultKey {
    type State<'a> = KeyVaultKeyState<'a>;

    const NAME: &'static str = "azurerm_key_vault_key";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => schema::string(Required, "Name of the key"),
                    "vault_uri" => schema::string(Required, "URI of the Key Vault holding the key"),
                    "key_type" => schema::string(Required, "Key type: EC, RSA or RSA-HSM"),
                    "key_size" => schema::number(Required, "Size of the key in bits"),
                    "key_opts" => schema::string_list(Required, "Operations allowed with the key"),
                    "version" => schema::string(Computed, "Current version of the key"),
                    "n" => schema::string(Computed, "RSA modulus"),
                    "e" => schema::string(Computed, "RSA public exponent"),
                    "tags" => tags::schema(),
                },
                description: Description::plain("Key stored in an Azure Key Vault"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::string_matches(
            diags,
            AttributePath::new("name"),
            &config.name,
            child_name_regex(),
            "may only contain alphanumeric characters and dashes",
        );
        validate::string_in_slice(
            diags,
            AttributePath::new("key_type"),
            &config.key_type,
            KEY_TYPES,
            false,
        );
        if let Value::Value(opts) = &config.key_opts {
            for (index, opt) in opts.iter().enumerate() {
                validate::string_in_slice(
                    diags,
                    AttributePath::new("key_opts").index(index as i64),
                    opt,
                    KEY_OPERATIONS,
                    false,
                );
            }
        }
        tags::validate(diags, AttributePath::new("tags"), &config.tags);
    }

    fn plan_create<'a>(&self, planned: &mut Self::State<'a>) {
        compute(&mut planned.version);
        compute(&mut planned.n);
        compute(&mut planned.e);
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("name", &prior.name, &planned.name)
            .path(
                AttributePath::new("vault_uri"),
                changed_with(&prior.vault_uri, &planned.vault_uri, trim_slash),
            )
            .field("key_type", &prior.key_type, &planned.key_type)
            .field("key_size", &prior.key_size, &planned.key_size)
            .build()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        let name = planned.name.as_str().to_owned();
        let vault = planned.vault_uri.as_str().to_owned();
        let keys = KeysClient::new(&ctx.client);

        let existing = keys.get(&vault, &name).await.found().with_context(|| {
            format!("checking for the existence of Key Vault Key {name:?} (Key Vault {vault:?})")
        })?;
        if let Some(kid) = existing.as_ref().and_then(|bundle| bundle.kid()) {
            return Err(RequiresImport::new(Self::NAME, kid).into());
        }

        let parameters = KeyCreateParameters {
            kty: planned.key_type.as_str().to_owned(),
            key_size: planned.key_size.as_ref_option().copied(),
            key_ops: expand_key_opts(&planned.key_opts),
            attributes: KeyAttributes {
                enabled: Some(true),
            },
            tags: Some(tags::expand(&planned.tags)),
        };
        keys.create(&vault, &name, &parameters)
            .await
            .with_context(|| format!("creating Key Vault Key {name:?} (Key Vault {vault:?})"))?;

        let created = keys
            .get(&vault, &name)
            .await
            .with_context(|| format!("reading Key Vault Key {name:?} (Key Vault {vault:?})"))?;
        let kid = created
            .kid()
            .ok_or_else(|| anyhow!("cannot read Key Vault Key {name:?} ID"))?
            .to_owned();

        let mut state = planned;
        state.id = Value::Value(Cow::Owned(kid));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Key Vault Key {name:?} disappeared after creation"))
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let id = KeyVaultChildId::parse(state.id.as_str())?;

        let Some(bundle) = KeysClient::new(&ctx.client)
            .get(&id.vault_base_url, &id.name)
            .await
            .found()
            .with_context(|| {
                format!("reading Key Vault Key {:?} (Key Vault {:?})", id.name, id.vault_base_url)
            })?
        else {
            debug!(name = %id.name, vault = %id.vault_base_url, "key not found");
            return Ok(None);
        };
        let key = bundle.key.unwrap_or_default();

        Ok(Some(KeyVaultKeyState {
            id: state.id.clone(),
            name: owned(Some(id.name.as_str())),
            vault_uri: keep_prior(&state.vault_uri, Some(id.vault_base_url.clone()), trim_slash),
            key_type: key.kty.map(Cow::Owned).into(),
            key_size: state.key_size,
            key_opts: flatten_key_opts(key.key_ops),
            version: owned(Some(id.version.as_str())),
            n: key.n.map(Cow::Owned).into(),
            e: key.e.map(Cow::Owned).into(),
            tags: tags::flatten(bundle.tags, &state.tags),
            timeouts: state.timeouts,
        }))
    }

    async fn update<'a>(
        &self,
        ctx: &Context,
        prior: Self::State<'a>,
        planned: Self::State<'a>,
    ) -> Result<Self::State<'a>> {
        let id = KeyVaultChildId::parse(prior.id.as_str())?;

        let parameters = KeyUpdateParameters {
            key_ops: expand_key_opts(&planned.key_opts),
            attributes: KeyAttributes {
                enabled: Some(true),
            },
            tags: Some(tags::expand(&planned.tags)),
        };
        KeysClient::new(&ctx.client)
            .update(&id.vault_base_url, &id.name, &id.version, &parameters)
            .await
            .with_context(|| {
                format!("updating Key Vault Key {:?} (Key Vault {:?})", id.name, id.vault_base_url)
            })?;

        self.read(ctx, planned)
            .await?
            .ok_or_else(|| anyhow!("Key Vault Key {:?} disappeared during update", id.name))
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let id = KeyVaultChildId::parse(state.id.as_str())?;

        KeysClient::new(&ctx.client)
            .delete(&id.vault_base_url, &id.name)
            .await
            .found()
            .with_context(|| {
                format!("deleting Key Vault Key {:?} (Key Vault {:?})", id.name, id.vault_base_url)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config<'a>(name: &'a str, key_type: &'a str, opts: &[&'a str]) -> KeyVaultKeyState<'a> {
        KeyVaultKeyState {
            name: Value::Value(Cow::Borrowed(name)),
            key_type: Value::Value(Cow::Borrowed(key_type)),
            key_opts: Value::Value(
                opts.iter()
                    .map(|opt| Value::Value(Cow::Borrowed(*opt)))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn key_types_are_case_sensitive() {
        let mut diags = Diagnostics::default();
        KeyVaultKey.validate(&mut diags, &config("key-1", "RSA-HSM", &["sign", "wrapKey"]));
        assert!(diags.errors.is_empty());

        KeyVaultKey.validate(&mut diags, &config("key-1", "rsa", &["sign"]));
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn invalid_names_and_operations() {
        let mut diags = Diagnostics::default();
        KeyVaultKey.validate(&mut diags, &config("key_1", "EC", &["Sign", "verify"]));
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn trailing_slash_does_not_replace() {
        let prior = KeyVaultKeyState {
            vault_uri: Value::Value(Cow::Borrowed("https://v.vault.azure.net")),
            ..Default::default()
        };
        let mut planned = prior.clone();
        planned.vault_uri = Value::Value(Cow::Borrowed("https://v.vault.azure.net/"));
        assert!(KeyVaultKey.replace_triggers(&prior, &planned).is_empty());
    }
}
