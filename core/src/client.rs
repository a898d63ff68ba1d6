#![deny(missing_docs)]

//! # Contract Client
//!
//! An HTTP client calling endpoints by their contract path template.
//!
//! ```ignore
//! let client = ApiClient::new("http://localhost:8080")?.with_contract(contract);
//! let user = client
//!     .get("/users/:id", RequestConfig::new().path_param("id", 7))
//!     .await?;
//! ```
//!
//! Non-2xx responses surface as [`ClientError::Status`]; use [`is_error_of`] to
//! test for a documented failure before trusting its body.

pub mod builder;
pub mod classify;

use crate::contract::{Contract, Method};
use crate::error::AppResult;
use crate::schema::ValidationError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub use builder::{build_request, OutboundRequest, RequestConfig, ResponseType};
pub use classify::{as_error_of, is_error_of, ClientError, ErrorResponse, ResponseBody};

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status received.
    pub status: u16,
    /// Body, normalized by the contract when one is attached.
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        self.body.json()
    }
}

/// Client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    contract: Option<Arc<Contract>>,
}

impl ApiClient {
    /// Creates a client for `base_url` (e.g. `http://localhost:8080/api`).
    pub fn new(base_url: &str) -> AppResult<Self> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            contract: None,
        })
    }

    /// Validates success bodies and classified error bodies against `contract`.
    pub fn with_contract(mut self, contract: impl Into<Arc<Contract>>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    /// Uses a preconfigured transport (timeouts, proxies, TLS...).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls (method, path) with the given inputs.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        let request = build_request(method, path, config.into());
        let (status, body) = self.send(&request).await?;

        if !(200..300).contains(&status) {
            return Err(ClientError::Status(ErrorResponse {
                method,
                path: path.to_string(),
                status,
                body,
            }));
        }

        let schema = self
            .contract
            .as_ref()
            .and_then(|contract| contract.endpoint(path, method))
            .and_then(|endpoint| endpoint.response_schema(status));
        let body = match (schema, body) {
            (Some(schema), ResponseBody::Json(value)) => {
                let validated = schema.validate(&value).map_err(|error| {
                    tracing::warn!(%method, path, status, %error, "response out of contract");
                    ClientError::OutOfContract {
                        method,
                        path: path.to_string(),
                        status,
                        error,
                    }
                })?;
                ResponseBody::Json(validated)
            }
            (_, body) => body,
        };

        Ok(ApiResponse { status, body })
    }

    async fn send(&self, request: &OutboundRequest) -> Result<(u16, ResponseBody), ClientError> {
        let url = format!("{}{}", self.base_url, request.url);
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self.http.request(request.method.to_reqwest(), &url);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(query) = &request.query_params {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = match request.response_type.unwrap_or_default() {
            ResponseType::Bytes => ResponseBody::Bytes(response.bytes().await?.to_vec()),
            ResponseType::Text => ResponseBody::Text(response.text().await?),
            ResponseType::Json => {
                let bytes = response.bytes().await?;
                if bytes.is_empty() {
                    ResponseBody::Empty
                } else {
                    serde_json::from_slice(&bytes)
                        .map(ResponseBody::Json)
                        .unwrap_or_else(|_| {
                            ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
                        })
                }
            }
        };
        Ok((status, body))
    }

    /// Calls `GET path`.
    pub async fn get(
        &self,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        self.call(Method::Get, path, config).await
    }

    /// Calls `POST path`.
    pub async fn post(
        &self,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        self.call(Method::Post, path, config).await
    }

    /// Calls `PUT path`.
    pub async fn put(
        &self,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        self.call(Method::Put, path, config).await
    }

    /// Calls `PATCH path`.
    pub async fn patch(
        &self,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        self.call(Method::Patch, path, config).await
    }

    /// Calls `DELETE path`.
    pub async fn delete(
        &self,
        path: &str,
        config: impl Into<Option<RequestConfig>>,
    ) -> Result<ApiResponse, ClientError> {
        self.call(Method::Delete, path, config).await
    }

    /// Narrows `error` to the documented failure (method, path, status) and
    /// returns its body.
    ///
    /// With a contract attached, the body is checked against the endpoint's
    /// error schema for that status. Returns `None` when `error` is not that failure.
    pub fn error_body(
        &self,
        error: &(dyn std::error::Error + 'static),
        method: Method,
        path: &str,
        status: u16,
    ) -> Option<Result<Value, ValidationError>> {
        let response = as_error_of(error, method, path, status)?;
        let value = response.body.to_value();
        let schema = self
            .contract
            .as_ref()
            .and_then(|contract| contract.endpoint(path, method))
            .and_then(|endpoint| endpoint.error_schema(status));
        Some(match schema {
            Some(schema) => schema.validate(&value),
            None => Ok(value),
        })
    }
}
