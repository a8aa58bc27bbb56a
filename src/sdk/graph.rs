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

use serde::{Deserialize, Serialize};

use crate::client::{ApiError, ArmClient, Audience};

pub const API_VERSION: &str = "1.6";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_to_other_tenants: Option<bool>,
    #[serde(rename = "oauth2AllowImplicitFlow", skip_serializing_if = "Option::is_none")]
    pub oauth2_allow_implicit_flow: Option<bool>,
}

/// Applications of the configured tenant, in the Azure AD Graph
pub struct ApplicationsClient<'c> {
    client: &'c ArmClient,
}

impl<'c> ApplicationsClient<'c> {
    pub fn new(client: &'c ArmClient) -> Self {
        Self { client }
    }

    fn url(&self, object_id: Option<&str>) -> Result<url::Url, ApiError> {
        match object_id {
            Some(object_id) => self
                .client
                .graph_url(&format!("applications/{object_id}"), API_VERSION),
            None => self.client.graph_url("applications", API_VERSION),
        }
    }

    pub async fn get(&self, object_id: &str) -> Result<Application, ApiError> {
        let url = self.url(Some(object_id))?;
        self.client.get(url, Audience::Graph).await
    }

    pub async fn create(&self, application: &Application) -> Result<Application, ApiError> {
        let url = self.url(None)?;
        self.client.post(url, Audience::Graph, application).await
    }

    pub async fn patch(&self, object_id: &str, application: &Application) -> Result<(), ApiError> {
        let url = self.url(Some(object_id))?;
        self.client
            .patch_no_content(url, Audience::Graph, application)
            .await
    }

    pub async fn delete(&self, object_id: &str) -> Result<(), ApiError> {
        let url = self.url(Some(object_id))?;
        self.client.delete(url, Audience::Graph).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn application_fields() {
        let app: Application = serde_json::from_value(json!({
            "odata.type": "Microsoft.DirectoryServices.Application",
            "objectId": "00000000-0000-0000-0000-000000000001",
            "appId": "00000000-0000-0000-0000-000000000002",
            "displayName": "acctest",
            "homepage": "http://acctest",
            "identifierUris": [],
            "replyUrls": ["http://acctest"],
            "availableToOtherTenants": false,
            "oauth2AllowImplicitFlow": true
        }))
        .unwrap();
        assert_eq!(app.oauth2_allow_implicit_flow, Some(true));
        assert_eq!(app.reply_urls.as_deref(), Some(&["http://acctest".to_owned()][..]));

        let body = Application {
            display_name: Some("acctest".to_owned()),
            oauth2_allow_implicit_flow: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"displayName": "acctest", "oauth2AllowImplicitFlow": false})
        );
    }
}
