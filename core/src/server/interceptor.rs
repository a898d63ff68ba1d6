#![deny(missing_docs)]

//! # Response Validation
//!
//! Checks JSON bodies produced by handlers against the schema the contract
//! documents for the status the handler chose.
//!
//! Resolution order for the schema: exact status, then `default`. With neither,
//! the response leaves unchecked. A matching body is replaced by its
//! normalized form, which drops undeclared fields. A violating body is
//! discarded and replaced by a fixed `500` response; the handler never sees the
//! failure.

use crate::contract::Endpoint;
use actix_web::body::{self, EitherBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderValue};
use actix_web::web::Bytes;
use actix_web::{Error, HttpResponse};
use futures::future::LocalBoxFuture;
use serde_json::{json, Value};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// `status` field of the fallback body.
pub const OUT_OF_SPEC_STATUS: &str = "Internal server error";
/// `message` field of the fallback body.
pub const OUT_OF_SPEC_MESSAGE: &str = "Server generated response is out of API spec";

/// The body sent in place of a response that violates the contract.
pub fn out_of_spec_body() -> Value {
    json!({
        "status": OUT_OF_SPEC_STATUS,
        "message": OUT_OF_SPEC_MESSAGE,
    })
}

fn out_of_spec_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(out_of_spec_body())
}

fn is_json(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

/// Outcome of checking one JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked {
    /// No schema applies to this status.
    Unchecked,
    /// The body conforms; carries its normalized form.
    Valid(Value),
    /// The body violates the contract.
    Invalid(String),
}

/// Checks a serialized body sent with `status`.
pub fn check_response_body(endpoint: &Endpoint, status: u16, bytes: &[u8]) -> Checked {
    let Some(schema) = endpoint.response_schema(status) else {
        return Checked::Unchecked;
    };
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => return Checked::Invalid(format!("malformed JSON: {}", e)),
    };
    match schema.validate(&value) {
        Ok(validated) => Checked::Valid(validated),
        Err(e) => Checked::Invalid(e.to_string()),
    }
}

/// Middleware factory validating responses against one endpoint.
pub struct ResponseValidation {
    endpoint: Arc<Endpoint>,
}

impl ResponseValidation {
    /// Creates the interceptor for `endpoint`.
    pub fn new(endpoint: Arc<Endpoint>) -> Self {
        Self { endpoint }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ResponseValidation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ResponseValidationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ResponseValidationMiddleware {
            service: Rc::new(service),
            endpoint: Arc::clone(&self.endpoint),
        }))
    }
}

/// Service produced by [`ResponseValidation`].
pub struct ResponseValidationMiddleware<S> {
    service: Rc<S>,
    endpoint: Arc<Endpoint>,
}

impl<S, B> Service<ServiceRequest> for ResponseValidationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let endpoint = Arc::clone(&self.endpoint);

        Box::pin(async move {
            let res = service.call(req).await?;
            let status = res.status().as_u16();
            if !is_json(res.headers()) || endpoint.response_schema(status).is_none() {
                return Ok(res.map_into_left_body());
            }

            let (req, res) = res.into_parts();
            let (mut res, body) = res.into_parts();

            let checked = match body::to_bytes(body).await {
                Ok(bytes) => match check_response_body(&endpoint, status, &bytes) {
                    Checked::Unchecked => Ok(res.set_body(bytes).map_into_boxed_body()),
                    Checked::Valid(value) => serde_json::to_vec(&value)
                        .map(|normalized| {
                            res.headers_mut().insert(
                                header::CONTENT_TYPE,
                                HeaderValue::from_static("application/json"),
                            );
                            res.set_body(Bytes::from(normalized)).map_into_boxed_body()
                        })
                        .map_err(|e| e.to_string()),
                    Checked::Invalid(reason) => Err(reason),
                },
                Err(_) => Err("response body could not be collected".to_string()),
            };

            let res = checked.unwrap_or_else(|reason| {
                tracing::error!(
                    method = %req.method(),
                    path = req.path(),
                    status,
                    reason = %reason,
                    "response rejected by contract"
                );
                out_of_spec_response()
            });

            Ok(ServiceResponse::new(req, res).map_into_right_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Public {
        name: String,
    }

    fn endpoint() -> Endpoint {
        Endpoint::new()
            .response(200, schema::typed::<Public>())
            .default_response(schema::empty_object())
    }

    #[test]
    fn test_valid_body_is_normalized() {
        let checked = check_response_body(&endpoint(), 200, br#"{"name":"a","secret":"s"}"#);
        assert_eq!(checked, Checked::Valid(json!({"name": "a"})));
    }

    #[test]
    fn test_invalid_body() {
        let checked = check_response_body(&endpoint(), 200, br#"{"nom":"a"}"#);
        assert!(matches!(checked, Checked::Invalid(_)));
    }

    #[test]
    fn test_default_schema_fallback() {
        let checked = check_response_body(&endpoint(), 418, br#"{"x":1}"#);
        assert_eq!(checked, Checked::Valid(json!({})));
        let checked = check_response_body(&endpoint(), 418, b"[1]");
        assert!(matches!(checked, Checked::Invalid(_)));
    }

    #[test]
    fn test_undocumented_status_unchecked() {
        let endpoint = Endpoint::new().response(200, schema::typed::<Public>());
        assert_eq!(check_response_body(&endpoint, 404, b"{}"), Checked::Unchecked);
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let checked = check_response_body(&endpoint(), 200, b"{");
        match checked {
            Checked::Invalid(reason) => assert!(reason.starts_with("malformed JSON")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_is_json() {
        let mut headers = header::HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn test_fallback_body() {
        assert_eq!(
            out_of_spec_body(),
            json!({
                "status": "Internal server error",
                "message": "Server generated response is out of API spec"
            })
        );
    }
}
