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

use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::client::{ApiError, ArmClient, Audience, RequestBody};

pub const API_VERSION: &str = "2016-11-01";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileStatusResult {
    #[serde(rename = "FileStatus", default)]
    pub file_status: Option<FileStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    #[serde(default)]
    pub length: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub modification_time: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileOperationResult {
    #[serde(rename = "boolean", default)]
    pub done: Option<bool>,
}

/// WebHDFS file system of a Data Lake Store account
pub struct FileSystemClient<'c> {
    client: &'c ArmClient,
}

impl<'c> FileSystemClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, account: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let base = self.client.data_lake_url(account)?;
        let mut url = base.join(&format!("webhdfs/v1/{}", path.trim_start_matches('/')))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("api-version", API_VERSION);
        }
        Ok(url)
    }

    /// Upload `contents` to a new file, failing if it exists
    pub async fn create(&self, account: &str, path: &str, contents: Vec<u8>) -> Result<(), ApiError> {
        let url = self.url(
            account,
            path,
            &[
                ("op", "CREATE"),
                ("write", "true"),
                ("overwrite", "false"),
                ("syncFlag", "CLOSE"),
            ],
        )?;
        self.client
            .send(
                Method::PUT,
                url,
                Audience::DataLake,
                Some(RequestBody::Bytes(contents)),
            )
            .await?;
        Ok(())
    }

    pub async fn get_file_status(&self, account: &str, path: &str) -> Result<FileStatusResult, ApiError> {
        let url = self.url(account, path, &[("op", "GETFILESTATUS"), ("tooId", "true")])?;
        self.client.get(url, Audience::DataLake).await
    }

    pub async fn delete(&self, account: &str, path: &str) -> Result<FileOperationResult, ApiError> {
        let url = self.url(account, path, &[("op", "DELETE"), ("recursive", "false")])?;
        let response = self
            .client
            .send(Method::DELETE, url, Audience::DataLake, None)
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_status() {
        let status: FileStatusResult = serde_json::from_str(
            r#"{"FileStatus":{"length":12,"pathSuffix":"","type":"FILE","modificationTime":1540000000000,"owner":"o"}}"#,
        )
        .unwrap();
        let status = status.file_status.unwrap();
        assert_eq!(status.length, Some(12));
        assert_eq!(status.kind.as_deref(), Some("FILE"));
    }
}
