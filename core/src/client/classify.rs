#![deny(missing_docs)]

//! # Error Classification
//!
//! Client calls fail with a [`ClientError`]. A documented failure case is a
//! [`ClientError::Status`] whose originating (method, path template, status)
//! triple matches exactly; [`is_error_of`] tests for it on any error value.

use crate::contract::Method;
use crate::error::AppResult;
use crate::schema::ValidationError;
use derive_more::{Display, From};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A response body as read by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body at all.
    Empty,
    /// Parsed JSON.
    Json(Value),
    /// Text (also used for JSON that failed to parse).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// The parsed JSON, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The body as a JSON value: text becomes a string, nothing or bytes become null.
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
            ResponseBody::Empty | ResponseBody::Bytes(_) => Value::Null,
        }
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

/// A non-2xx response together with the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// Method of the originating call.
    pub method: Method,
    /// Path template of the originating call (e.g. `/users/:id`).
    pub path: String,
    /// Status received.
    pub status: u16,
    /// Body received.
    pub body: ResponseBody,
}

/// Failure of a client call.
#[derive(Debug, Display, From)]
pub enum ClientError {
    /// No response was received (connection, timeout, request building).
    #[display("Transport Error: {_0}")]
    Transport(reqwest::Error),

    /// The server answered with a non-success status.
    #[display("{} {} responded with status {}", _0.method, _0.path, _0.status)]
    Status(ErrorResponse),

    /// A success body did not match the contract.
    #[from(ignore)]
    #[display("{method} {path} returned a {status} body out of contract: {error}")]
    OutOfContract {
        /// Method of the originating call.
        method: Method,
        /// Path template of the originating call.
        path: String,
        /// Status received.
        status: u16,
        /// What the schema reported.
        error: ValidationError,
    },
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            ClientError::OutOfContract { error, .. } => Some(error),
            ClientError::Status(_) => None,
        }
    }
}

impl ClientError {
    /// The received status, when a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Status(response) => Some(response.status),
            ClientError::OutOfContract { status, .. } => Some(*status),
        }
    }
}

/// Narrows `error` to the documented failure (method, path, status), if it is exactly that.
pub fn as_error_of<'e>(
    error: &'e (dyn std::error::Error + 'static),
    method: Method,
    path: &str,
    status: u16,
) -> Option<&'e ErrorResponse> {
    match error.downcast_ref::<ClientError>()? {
        ClientError::Status(response)
            if response.method == method && response.path == path && response.status == status =>
        {
            Some(response)
        }
        _ => None,
    }
}

/// Whether `error` is exactly the documented failure (method, path, status).
pub fn is_error_of(
    error: &(dyn std::error::Error + 'static),
    method: Method,
    path: &str,
    status: u16,
) -> bool {
    as_error_of(error, method, path, status).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn not_found() -> ClientError {
        ClientError::Status(ErrorResponse {
            method: Method::Get,
            path: "/users/:id".into(),
            status: 404,
            body: ResponseBody::Json(json!({"message": "missing"})),
        })
    }

    #[test]
    fn test_exact_match() {
        let err = not_found();
        assert!(is_error_of(&err, Method::Get, "/users/:id", 404));
    }

    #[test]
    fn test_any_field_mismatch() {
        let err = not_found();
        assert!(!is_error_of(&err, Method::Post, "/users/:id", 404));
        assert!(!is_error_of(&err, Method::Get, "/users", 404));
        assert!(!is_error_of(&err, Method::Get, "/users/:id", 400));
    }

    #[test]
    fn test_other_errors_never_match() {
        let io = std::io::Error::other("boom");
        assert!(!is_error_of(&io, Method::Get, "/users/:id", 404));

        let out_of_contract = ClientError::OutOfContract {
            method: Method::Get,
            path: "/users/:id".into(),
            status: 404,
            error: ValidationError::new("bad"),
        };
        assert!(!is_error_of(&out_of_contract, Method::Get, "/users/:id", 404));
    }

    #[test]
    fn test_narrowed_body() {
        #[derive(serde::Deserialize)]
        struct NotFound {
            message: String,
        }

        let err = not_found();
        let response = as_error_of(&err, Method::Get, "/users/:id", 404).unwrap();
        assert_eq!(response.body.json::<NotFound>().unwrap().message, "missing");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "get /users/:id responded with status 404");
    }

    #[test]
    fn test_body_values() {
        assert_eq!(ResponseBody::Empty.to_value(), Value::Null);
        assert_eq!(ResponseBody::Text("x".into()).to_value(), json!("x"));
        assert!(ResponseBody::Text("x".into()).as_json().is_none());
    }
}
