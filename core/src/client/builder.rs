#![deny(missing_docs)]

//! # Request Builder
//!
//! Turns a method, a path template and an optional [`RequestConfig`] into the
//! [`OutboundRequest`] handed to the transport.
//!
//! Parts absent from the config stay `None` so the transport's own defaults
//! apply. Placeholders without a value are left in the URL as written.

use crate::contract::{placeholders, replace_placeholders, Method};
use crate::error::AppResult;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// How the response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Parse as JSON; falls back to text when parsing fails.
    #[default]
    Json,
    /// Read as UTF-8 text.
    Text,
    /// Keep raw bytes.
    Bytes,
}

/// Inputs of one call. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Values for the `:name` placeholders of the path.
    pub path: Option<Map<String, Value>>,
    /// Query parameters.
    pub query: Option<Value>,
    /// Extra request headers.
    pub header: Option<IndexMap<String, String>>,
    /// JSON body.
    pub body: Option<Value>,
    /// How to read the response.
    pub response_type: Option<ResponseType>,
}

impl RequestConfig {
    /// An empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one path placeholder value.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replaces the query with any serializable value. Null fields are dropped.
    pub fn query<T: Serialize>(mut self, query: &T) -> AppResult<Self> {
        let mut query = serde_json::to_value(query)?;
        if let Value::Object(map) = &mut query {
            map.retain(|_, value| !value.is_null());
        }
        self.query = Some(query);
        Ok(self)
    }

    /// Sets one query parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let query = self
            .query
            .get_or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = query {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Sets one request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    pub fn body<T: Serialize>(mut self, body: &T) -> AppResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets how the response is read.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }
}

/// The message handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Path with placeholders resolved, relative to the client's base URL.
    pub url: String,
    /// Extra headers.
    pub headers: Option<IndexMap<String, String>>,
    /// Query parameters.
    pub query_params: Option<Value>,
    /// JSON body.
    pub body: Option<Value>,
    /// How to read the response.
    pub response_type: Option<ResponseType>,
}

/// String form of a placeholder value. Strings are used as is, anything else as JSON text.
fn path_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the outbound request for `method` and `template`.
pub fn build_request(method: Method, template: &str, config: Option<RequestConfig>) -> OutboundRequest {
    let Some(config) = config else {
        return OutboundRequest {
            method,
            url: template.to_string(),
            headers: None,
            query_params: None,
            body: None,
            response_type: None,
        };
    };

    let url = match &config.path {
        Some(params) => replace_placeholders(template, |name| params.get(name).map(path_value)),
        None => template.to_string(),
    };
    let unresolved = placeholders(&url);
    if !unresolved.is_empty() {
        tracing::debug!(template, ?unresolved, "path placeholders left unresolved");
    }

    OutboundRequest {
        method,
        url,
        headers: config.header,
        query_params: config.query,
        body: config.body,
        response_type: config.response_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_substitution() {
        let req = build_request(
            Method::Get,
            "/users/:id",
            Some(RequestConfig::new().path_param("id", 7)),
        );
        assert_eq!(req.url, "/users/7");
        assert_eq!(req.method, Method::Get);
    }

    #[test]
    fn test_no_config_keeps_template() {
        let req = build_request(Method::Get, "/users/:id", None);
        assert_eq!(req.url, "/users/:id");
        assert_eq!(req.headers, None);
        assert_eq!(req.query_params, None);
        assert_eq!(req.body, None);
        assert_eq!(req.response_type, None);
    }

    #[test]
    fn test_unmatched_placeholder_left_verbatim() {
        let req = build_request(
            Method::Get,
            "/orgs/:org/users/:id",
            Some(RequestConfig::new().path_param("id", "abc")),
        );
        assert_eq!(req.url, "/orgs/:org/users/abc");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let req = build_request(
            Method::Get,
            "/a/:x/b/:x",
            Some(RequestConfig::new().path_param("x", true)),
        );
        assert_eq!(req.url, "/a/true/b/true");
    }

    #[test]
    fn test_parts_map_through() {
        let config = RequestConfig::new()
            .query_param("active", true)
            .header("x-trace", "1")
            .body(&json!({"name": "ann"}))
            .unwrap()
            .response_type(ResponseType::Text);
        let req = build_request(Method::Post, "/users", Some(config));
        assert_eq!(req.url, "/users");
        assert_eq!(req.query_params, Some(json!({"active": true})));
        assert_eq!(req.headers.unwrap().get("x-trace").map(String::as_str), Some("1"));
        assert_eq!(req.body, Some(json!({"name": "ann"})));
        assert_eq!(req.response_type, Some(ResponseType::Text));
    }

    #[test]
    fn test_query_drops_nulls() {
        let config = RequestConfig::new()
            .query(&json!({"email": "ann", "limit": null}))
            .unwrap();
        assert_eq!(config.query, Some(json!({"email": "ann"})));
    }

    #[test]
    fn test_empty_config_omits_parts() {
        let req = build_request(Method::Delete, "/users/:id", Some(RequestConfig::new()));
        assert_eq!(req.url, "/users/:id");
        assert_eq!(req.body, None);
        assert_eq!(req.query_params, None);
    }
}
