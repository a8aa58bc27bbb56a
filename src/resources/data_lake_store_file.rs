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

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::{self, Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::arm_state;
use crate::client::NotFoundExt;
use crate::helpers::id::DataLakeStoreFileId;
use crate::helpers::schema::{self, Required};
use crate::helpers::timeouts::TimeoutsState;
use crate::helpers::{owned, validate, RequiresImport};
use crate::resource::{AzureAdapter, Context, ReplaceTriggers};
use crate::sdk::datalake::FileSystemClient;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataLakeStoreFileState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub account_name: ValueString<'a>,
    pub remote_file_path: ValueString<'a>,
    pub local_file_path: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<TimeoutsState<'a>>,
}

arm_state!(DataLakeStoreFileState);

#[derive(Debug, Default, Clone, Copy)]
pub struct DataLakeStoreFile;

#[async_trait]
impl AzureAdapter for DataLakeStoreFile {
    type State<'a> = DataLakeStoreFileState<'a>;

    const NAME: &'static str = "azurerm_data_lake_store_file";

    fn schema(&self) -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "account_name" => schema::string(Required, "Name of the Data Lake Store account"),
                    "remote_file_path" => schema::string(Required, "Absolute path of the file in the store"),
                    "local_file_path" => schema::string(Required, "Local file uploaded to the store"),
                },
                description: Description::plain("File uploaded to a Data Lake Store"),
                ..Default::default()
            },
        }
    }

    fn validate<'a>(&self, diags: &mut Diagnostics, config: &Self::State<'a>) {
        validate::not_empty(diags, AttributePath::new("account_name"), &config.account_name);
        validate::file_path(diags, AttributePath::new("remote_file_path"), &config.remote_file_path);
        validate::not_empty(diags, AttributePath::new("local_file_path"), &config.local_file_path);
    }

    fn replace_triggers<'a>(
        &self,
        prior: &Self::State<'a>,
        planned: &Self::State<'a>,
    ) -> Vec<AttributePath> {
        ReplaceTriggers::new()
            .field("account_name", &prior.account_name, &planned.account_name)
            .field("remote_file_path", &prior.remote_file_path, &planned.remote_file_path)
            .field("local_file_path", &prior.local_file_path, &planned.local_file_path)
            .build()
    }

    async fn create<'a>(&self, ctx: &Context, planned: Self::State<'a>) -> Result<Self::State<'a>> {
        let account = planned.account_name.as_str().to_owned();
        let remote_path = planned.remote_file_path.as_str().to_owned();
        let local_path = planned.local_file_path.as_str().to_owned();
        let files = FileSystemClient::new(&ctx.client);
        let id = DataLakeStoreFileId::format(
            &account,
            &ctx.client.environment().data_lake_suffix,
            &remote_path,
        );

        let existing = files
            .get_file_status(&account, &remote_path)
            .await
            .found()
            .with_context(|| {
                format!("checking for the existence of Data Lake Store File {remote_path:?} (Account {account:?})")
            })?;
        if existing.is_some() {
            return Err(RequiresImport::new(Self::NAME, id).into());
        }

        let contents = tokio::fs::read(&local_path)
            .await
            .with_context(|| format!("opening file {local_path:?}"))?;
        debug!(file = %local_path, size = contents.len(), "uploading");
        files
            .create(&account, &remote_path, contents)
            .await
            .with_context(|| {
                format!("issuing create request for Data Lake Store File {remote_path:?}")
            })?;

        let mut state = planned;
        state.id = Value::Value(Cow::Owned(id));
        self.read(ctx, state)
            .await?
            .ok_or_else(|| anyhow!("Data Lake Store File {remote_path:?} disappeared after upload"))
    }

    async fn read<'a>(
        &self,
        ctx: &Context,
        state: Self::State<'a>,
    ) -> Result<Option<Self::State<'a>>> {
        let id = DataLakeStoreFileId::parse(state.id.as_str())?;

        let status = FileSystemClient::new(&ctx.client)
            .get_file_status(&id.account, &id.path)
            .await
            .found()
            .with_context(|| {
                format!(
                    "making Read request on Azure Data Lake Store File {:?} (Account {:?})",
                    id.path, id.account
                )
            })?;
        if status.is_none() {
            warn!(file = %id.path, account = %id.account, "Data Lake Store File was not found");
            return Ok(None);
        }

        Ok(Some(DataLakeStoreFileState {
            id: state.id.clone(),
            account_name: owned(Some(id.account.as_str())),
            remote_file_path: owned(Some(id.path.as_str())),
            local_file_path: state.local_file_path.clone(),
            timeouts: state.timeouts,
        }))
    }

    async fn delete<'a>(&self, ctx: &Context, state: Self::State<'a>) -> Result<()> {
        let id = DataLakeStoreFileId::parse(state.id.as_str())?;

        FileSystemClient::new(&ctx.client)
            .delete(&id.account, &id.path)
            .await
            .found()
            .with_context(|| {
                format!(
                    "issuing delete request for Data Lake Store File {:?} (Account {:?})",
                    id.path, id.account
                )
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_must_be_absolute() {
        let mut diags = Diagnostics::default();
        let config = DataLakeStoreFileState {
            account_name: Value::Value(Cow::Borrowed("acctest")),
            remote_file_path: Value::Value(Cow::Borrowed("test/example.txt")),
            local_file_path: Value::Value(Cow::Borrowed("/tmp/example.txt")),
            ..Default::default()
        };
        DataLakeStoreFile.validate(&mut diags, &config);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn every_field_forces_replacement() {
        let prior = DataLakeStoreFileState {
            local_file_path: Value::Value(Cow::Borrowed("/tmp/a.txt")),
            ..Default::default()
        };
        let mut planned = prior.clone();
        planned.local_file_path = Value::Value(Cow::Borrowed("/tmp/b.txt"));
        assert_eq!(
            DataLakeStoreFile.replace_triggers(&prior, &planned),
            vec![AttributePath::new("local_file_path")]
        );
    }
}
