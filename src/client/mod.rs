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

use std::time::Duration;

use reqwest::{header, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

mod auth;
mod error;

pub use auth::{Authorizer, Credentials};
pub use error::{ApiError, NotFoundExt};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Service a token is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    ResourceManager,
    KeyVault,
    DataLake,
    Graph,
}

/// Endpoints of one Azure cloud
#[derive(Debug, Clone)]
pub struct Environment {
    pub name: &'static str,
    pub resource_manager: Url,
    pub active_directory: Url,
    pub graph: Url,
    pub resource_manager_audience: String,
    pub key_vault_audience: String,
    pub data_lake_audience: String,
    pub data_lake_suffix: String,
}

impl Environment {
    pub const NAMES: &'static [&'static str] = &["public", "usgovernment", "german", "china"];

    /// Look up a cloud by its provider-level name
    pub fn from_name(name: &str) -> Result<Self, ApiError> {
        let (name, arm, aad, graph, vault, lake, lake_suffix) = match name.to_lowercase().as_str() {
            "" | "public" => (
                "public",
                "https://management.azure.com/",
                "https://login.microsoftonline.com/",
                "https://graph.windows.net/",
                "https://vault.azure.net",
                "https://datalake.azure.net/",
                "azuredatalakestore.net",
            ),
            "usgovernment" => (
                "usgovernment",
                "https://management.usgovcloudapi.net/",
                "https://login.microsoftonline.us/",
                "https://graph.windows.net/",
                "https://vault.usgovcloudapi.net",
                "https://datalake.azure.net/",
                "azuredatalakestore.net",
            ),
            "german" => (
                "german",
                "https://management.microsoftazure.de/",
                "https://login.microsoftonline.de/",
                "https://graph.cloudapi.de/",
                "https://vault.microsoftazure.de",
                "https://datalake.azure.net/",
                "azuredatalakestore.net",
            ),
            "china" => (
                "china",
                "https://management.chinacloudapi.cn/",
                "https://login.chinacloudapi.cn/",
                "https://graph.chinacloudapi.cn/",
                "https://vault.azure.cn",
                "https://datalake.azure.net/",
                "azuredatalakestore.net",
            ),
            other => {
                return Err(ApiError::Auth {
                    message: format!(
                        "unknown environment {other:?}, expected one of {:?}",
                        Self::NAMES
                    ),
                })
            }
        };
        Ok(Self {
            name,
            resource_manager: Url::parse(arm)?,
            active_directory: Url::parse(aad)?,
            graph: Url::parse(graph)?,
            resource_manager_audience: arm.to_owned(),
            key_vault_audience: vault.to_owned(),
            data_lake_audience: lake.to_owned(),
            data_lake_suffix: lake_suffix.to_owned(),
        })
    }

    /// Route every service to a single base url
    pub fn single_endpoint(base: &Url) -> Self {
        Self {
            name: "custom",
            resource_manager: base.clone(),
            active_directory: base.clone(),
            graph: base.clone(),
            resource_manager_audience: base.to_string(),
            key_vault_audience: base.to_string(),
            data_lake_audience: base.to_string(),
            data_lake_suffix: "azuredatalakestore.net".to_owned(),
        }
    }
}

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Authenticated client shared by every resource of the provider
#[derive(Debug)]
pub struct ArmClient {
    http: reqwest::Client,
    environment: Environment,
    subscription_id: String,
    authorizer: Authorizer,
    poll_interval: Duration,
    data_lake_endpoint: Option<Url>,
}

#[derive(Deserialize)]
struct AsyncOperation {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<AsyncOperationError>,
}

#[derive(Deserialize)]
struct AsyncOperationError {
    #[serde(default)]
    message: String,
}

enum PollTarget {
    AsyncOperation(Url),
    Location(Url),
}

impl ArmClient {
    pub fn new(
        environment: Environment,
        subscription_id: impl Into<String>,
        authorizer: Authorizer,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "terraform-provider-azurerm/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            http,
            environment,
            subscription_id: subscription_id.into(),
            authorizer,
            poll_interval: DEFAULT_POLL_INTERVAL,
            data_lake_endpoint: None,
        })
    }

    /// Interval between two polls of a long-running operation
    /// when the service does not send `Retry-After`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Send Data Lake Store requests to a fixed endpoint instead of `{account}.{suffix}`
    pub fn with_data_lake_endpoint(mut self, endpoint: Url) -> Self {
        self.data_lake_endpoint = Some(endpoint);
        self
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn tenant_id(&self) -> &str {
        self.authorizer.tenant_id()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Url of a Resource Manager path, with its `api-version`
    pub fn resource_manager_url(&self, path: &str, api_version: &str) -> Result<Url, ApiError> {
        let mut url = self
            .environment
            .resource_manager
            .join(path.trim_start_matches('/'))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Url of an AD Graph path for the configured tenant
    pub fn graph_url(&self, path: &str, api_version: &str) -> Result<Url, ApiError> {
        let mut url = self.environment.graph.join(&format!(
            "{}/{}",
            self.tenant_id(),
            path.trim_start_matches('/')
        ))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Base url of a Data Lake Store account
    pub fn data_lake_url(&self, account: &str) -> Result<Url, ApiError> {
        match &self.data_lake_endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Ok(Url::parse(&format!(
                "https://{account}.{}/",
                self.environment.data_lake_suffix
            ))?),
        }
    }

    fn audience(&self, audience: Audience) -> &str {
        match audience {
            Audience::ResourceManager => &self.environment.resource_manager_audience,
            Audience::KeyVault => &self.environment.key_vault_audience,
            Audience::DataLake => &self.environment.data_lake_audience,
            Audience::Graph => self.environment.graph.as_str(),
        }
    }

    /// Send a request and map any failure status to an [`ApiError`]
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        audience: Audience,
        body: Option<RequestBody>,
    ) -> Result<Response, ApiError> {
        let token = self
            .authorizer
            .token(&self.http, self.audience(audience))
            .await?;

        debug!(%method, %url, "sending request");
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token);
        request = match body {
            Some(RequestBody::Json(json)) => request.json(&json),
            Some(RequestBody::Bytes(bytes)) => request
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        trace!(%method, %url, %status, "received response");

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_body(status.as_u16(), url.as_str(), &body))
        }
    }

    async fn send_json<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        audience: Audience,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let body = match body {
            Some(body) => Some(RequestBody::Json(serde_json::to_value(body)?)),
            None => None,
        };
        self.send(method, url, audience, body).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        audience: Audience,
    ) -> Result<T, ApiError> {
        let response = self
            .send_json::<()>(Method::GET, url, audience, None)
            .await?;
        decode(response).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        audience: Audience,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_json(Method::PUT, url, audience, Some(body))
            .await?;
        decode(response).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        audience: Audience,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_json(Method::PATCH, url, audience, Some(body))
            .await?;
        decode(response).await
    }

    /// PATCH for services answering `204 No Content`
    pub async fn patch_no_content<B: Serialize>(
        &self,
        url: Url,
        audience: Audience,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send_json(Method::PATCH, url, audience, Some(body))
            .await?;
        Ok(())
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        audience: Audience,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_json(Method::POST, url, audience, Some(body))
            .await?;
        decode(response).await
    }

    pub async fn delete(&self, url: Url, audience: Audience) -> Result<(), ApiError> {
        self.send_json::<()>(Method::DELETE, url, audience, None)
            .await?;
        Ok(())
    }

    /// PUT a Resource Manager resource and wait for its provisioning to finish
    pub async fn put_long_running<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_json(Method::PUT, url.clone(), Audience::ResourceManager, Some(body))
            .await?;
        match poll_target(&response)? {
            None => decode(response).await,
            Some(target) => {
                self.wait(target).await?;
                self.get(url, Audience::ResourceManager).await
            }
        }
    }

    /// DELETE a Resource Manager resource and wait for the deletion to finish
    pub async fn delete_long_running(&self, url: Url) -> Result<(), ApiError> {
        let response = self
            .send_json::<()>(Method::DELETE, url, Audience::ResourceManager, None)
            .await?;
        if let Some(target) = poll_target(&response)? {
            self.wait(target).await?;
        }
        Ok(())
    }

    async fn wait(&self, target: PollTarget) -> Result<(), ApiError> {
        loop {
            match &target {
                PollTarget::AsyncOperation(url) => {
                    let response = self
                        .send_json::<()>(
                            Method::GET,
                            url.clone(),
                            Audience::ResourceManager,
                            None,
                        )
                        .await?;
                    let delay = retry_after(&response).unwrap_or(self.poll_interval);
                    let operation: AsyncOperation = decode(response).await?;
                    match operation.status.as_str() {
                        "Succeeded" => return Ok(()),
                        "Failed" | "Canceled" | "Cancelled" => {
                            return Err(ApiError::OperationFailed {
                                status: operation.status,
                                message: operation.error.map(|e| e.message).unwrap_or_default(),
                            })
                        }
                        status => {
                            debug!(%url, status, "operation in progress");
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                PollTarget::Location(url) => {
                    let response = self
                        .send_json::<()>(
                            Method::GET,
                            url.clone(),
                            Audience::ResourceManager,
                            None,
                        )
                        .await?;
                    if response.status() != StatusCode::ACCEPTED {
                        return Ok(());
                    }
                    let delay = retry_after(&response).unwrap_or(self.poll_interval);
                    debug!(%url, "operation in progress");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn poll_target(response: &Response) -> Result<Option<PollTarget>, ApiError> {
    let status = response.status();
    if status != StatusCode::CREATED && status != StatusCode::ACCEPTED {
        return Ok(None);
    }
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    if let Some(url) = header("Azure-AsyncOperation") {
        return Ok(Some(PollTarget::AsyncOperation(Url::parse(&url)?)));
    }
    if let Some(url) = header("Location") {
        return Ok(Some(PollTarget::Location(Url::parse(&url)?)));
    }
    Ok(None)
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Decode a json body, treating an empty body as `null`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        Ok(serde_json::from_value(serde_json::Value::Null)?)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ArmClient {
        let base = Url::parse(&server.base_url()).unwrap();
        ArmClient::new(
            Environment::single_endpoint(&base),
            "sub",
            Authorizer::new(
                Credentials::Static {
                    token: "token".into(),
                },
                base,
                "tenant",
            ),
        )
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn environments() {
        let public = Environment::from_name("public").unwrap();
        assert_eq!(public.resource_manager.as_str(), "https://management.azure.com/");
        let china = Environment::from_name("China").unwrap();
        assert_eq!(china.name, "china");
        assert!(Environment::from_name("mars").is_err());
    }

    #[tokio::test]
    async fn put_waits_for_async_operation() {
        let server = MockServer::start();
        let operation = server.url("/operations/1");
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/subscriptions/sub/thing")
                .query_param("api-version", "2020-01-01")
                .header("authorization", "Bearer token");
            then.status(201)
                .header("Azure-AsyncOperation", operation.as_str())
                .json_body(json!({"name": "thing", "state": "Creating"}));
        });
        let poll = server.mock(|when, then| {
            when.method(GET).path("/operations/1");
            then.status(200).json_body(json!({"status": "Succeeded"}));
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/subscriptions/sub/thing");
            then.status(200)
                .json_body(json!({"name": "thing", "state": "Ready"}));
        });

        let client = client(&server);
        let url = client
            .resource_manager_url("/subscriptions/sub/thing", "2020-01-01")
            .unwrap();
        let result: serde_json::Value = client
            .put_long_running(url, &json!({"name": "thing"}))
            .await
            .unwrap();

        assert_eq!(result["state"], "Ready");
        put.assert();
        poll.assert();
        get.assert();
    }

    #[tokio::test]
    async fn failed_operation_is_reported() {
        let server = MockServer::start();
        let operation = server.url("/operations/2");
        server.mock(|when, then| {
            when.method(DELETE).path("/subscriptions/sub/thing");
            then.status(202)
                .header("Azure-AsyncOperation", operation.as_str());
        });
        server.mock(|when, then| {
            when.method(GET).path("/operations/2");
            then.status(200).json_body(
                json!({"status": "Failed", "error": {"code": "Conflict", "message": "in use"}}),
            );
        });

        let client = client(&server);
        let url = client
            .resource_manager_url("/subscriptions/sub/thing", "2020-01-01")
            .unwrap();
        let err = client.delete_long_running(url).await.unwrap_err();
        assert!(matches!(err, ApiError::OperationFailed { .. }));
        assert!(err.to_string().contains("in use"));
    }

    #[tokio::test]
    async fn location_polling() {
        let server = MockServer::start();
        let location = server.url("/operations/3");
        server.mock(|when, then| {
            when.method(DELETE).path("/subscriptions/sub/thing");
            then.status(202).header("Location", location.as_str());
        });
        let poll = server.mock(|when, then| {
            when.method(GET).path("/operations/3");
            then.status(200);
        });

        let client = client(&server);
        let url = client
            .resource_manager_url("/subscriptions/sub/thing", "2020-01-01")
            .unwrap();
        client.delete_long_running(url).await.unwrap();
        poll.assert();
    }

    #[tokio::test]
    async fn missing_resource() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/subscriptions/sub/missing");
            then.status(404).json_body(
                json!({"error": {"code": "ResourceNotFound", "message": "not here"}}),
            );
        });

        let client = client(&server);
        let url = client
            .resource_manager_url("/subscriptions/sub/missing", "2020-01-01")
            .unwrap();
        let res: Result<Option<serde_json::Value>, _> =
            client.get(url, Audience::ResourceManager).await.found();
        assert!(matches!(res, Ok(None)));
    }
}
