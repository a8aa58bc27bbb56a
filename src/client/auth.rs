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
use std::fmt::Debug;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::ApiError;

const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// How the provider proves its identity to Azure Active Directory
#[derive(Clone)]
pub enum Credentials {
    /// OAuth2 client-credentials flow with a service principal secret
    ClientSecret {
        client_id: String,
        client_secret: String,
    },
    /// Pre-acquired bearer token, used for every audience
    Static { token: String },
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientSecret { client_id, .. } => f
                .debug_struct("ClientSecret")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::Static { .. } => f.debug_struct("Static").finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: serde_json::Value,
}

impl TokenResponse {
    fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        };
        Duration::from_secs(secs.unwrap_or(3600))
    }
}

/// Per-audience bearer token cache
#[derive(Debug)]
pub struct Authorizer {
    credentials: Credentials,
    authority: Url,
    tenant_id: String,
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl Authorizer {
    pub fn new(credentials: Credentials, authority: Url, tenant_id: impl Into<String>) -> Self {
        Self {
            credentials,
            authority,
            tenant_id: tenant_id.into(),
            tokens: Default::default(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Get a valid token for `audience`, requesting a new one when the cached
    /// token is missing or about to expire
    pub async fn token(&self, http: &reqwest::Client, audience: &str) -> Result<String, ApiError> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::Static { token } => return Ok(token.clone()),
            Credentials::ClientSecret {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.get(audience) {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let url = self
            .authority
            .join(&format!("{}/oauth2/token", self.tenant_id))?;
        debug!(audience, "requesting access token");

        let response = http
            .post(url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("resource", audience),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Auth {
                message: format!("token request for {audience} returned {status}: {body}"),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        let expires_at = Instant::now() + token.lifetime();
        tokens.insert(
            audience.to_owned(),
            AccessToken {
                value: token.access_token.clone(),
                expires_at,
            },
        );

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn static_token_skips_authority() {
        let auth = Authorizer::new(
            Credentials::Static {
                token: "abc".into(),
            },
            Url::parse("http://127.0.0.1:1/").unwrap(),
            "tenant",
        );
        let token = auth
            .token(&reqwest::Client::new(), "https://management.azure.com/")
            .await
            .unwrap();
        assert_eq!(token, "abc");
    }

    #[tokio::test]
    async fn client_secret_token_is_cached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/tenant/oauth2/token")
                .body_contains("grant_type=client_credentials")
                .body_contains("client_id=app");
            then.status(200).json_body(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": "3599",
                "access_token": "secret-token"
            }));
        });

        let auth = Authorizer::new(
            Credentials::ClientSecret {
                client_id: "app".into(),
                client_secret: "pwd".into(),
            },
            Url::parse(&server.base_url()).unwrap(),
            "tenant",
        );
        let http = reqwest::Client::new();
        for _ in 0..3 {
            let token = auth.token(&http, "https://vault.azure.net").await.unwrap();
            assert_eq!(token, "secret-token");
        }
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/tenant/oauth2/token");
            then.status(401).body("invalid_client");
        });

        let auth = Authorizer::new(
            Credentials::ClientSecret {
                client_id: "app".into(),
                client_secret: "wrong".into(),
            },
            Url::parse(&server.base_url()).unwrap(),
            "tenant",
        );
        let err = auth
            .token(&reqwest::Client::new(), "https://graph.windows.net/")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth { .. }));
    }
}
