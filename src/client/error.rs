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

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Azure REST client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected status {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("long-running operation ended with status {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_status(&self, expected: u16) -> bool {
        match self {
            ApiError::NotFound { .. } => expected == 404,
            ApiError::Status { status, .. } => *status == expected,
            _ => false,
        }
    }

    /// Build an error from a non-success response body.
    ///
    /// ARM wraps errors as `{"error": {"code", "message"}}`, Key Vault does the same,
    /// AD Graph uses `{"odata.error": {"code", "message": {"value"}}}` and WebHDFS
    /// uses `{"RemoteException": {"exception", "message"}}`.
    pub(crate) fn from_body(status: u16, url: &str, body: &str) -> Self {
        if status == 404 {
            return ApiError::NotFound {
                url: url.to_owned(),
            };
        }

        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: Some(detail),
                ..
            }) => (detail.code, detail.message),
            Ok(ErrorEnvelope {
                graph: Some(detail),
                ..
            }) => (detail.code, detail.message.value),
            Ok(ErrorEnvelope {
                remote: Some(detail),
                ..
            }) => (detail.exception, detail.message),
            _ => (String::new(), body.to_owned()),
        };

        ApiError::Status {
            status,
            code,
            message,
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
    #[serde(rename = "odata.error")]
    graph: Option<GraphErrorDetail>,
    #[serde(rename = "RemoteException")]
    remote: Option<RemoteException>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GraphErrorDetail {
    code: String,
    message: GraphMessage,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GraphMessage {
    value: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RemoteException {
    exception: String,
    message: String,
}

/// Turn a not-found failure into an absent value
pub trait NotFoundExt<T> {
    fn found(self) -> Result<Option<T>, ApiError>;
}

impl<T> NotFoundExt<T> for Result<T, ApiError> {
    fn found(self) -> Result<Option<T>, ApiError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_error_body() {
        let err = ApiError::from_body(
            409,
            "https://management.azure.com/x",
            r#"{"error":{"code":"Conflict","message":"busy"}}"#,
        );
        match err {
            ApiError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "Conflict");
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn graph_error_body() {
        let err = ApiError::from_body(
            400,
            "https://graph.windows.net/t/applications",
            r#"{"odata.error":{"code":"Request_BadRequest","message":{"lang":"en","value":"bad uri"}}}"#,
        );
        assert!(err.to_string().contains("Request_BadRequest"));
        assert!(err.to_string().contains("bad uri"));
    }

    #[test]
    fn not_found_is_absent() {
        let res: Result<(), ApiError> = Err(ApiError::from_body(404, "u", ""));
        assert!(matches!(res.found(), Ok(None)));

        let res: Result<(), ApiError> = Err(ApiError::from_body(500, "u", "boom"));
        assert!(res.found().is_err());
    }
}
