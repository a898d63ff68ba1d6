#![deny(missing_docs)]

//! # Request Validation
//!
//! Validates the path, query and JSON body of an inbound request against its
//! [`Endpoint`] before any business handler runs.
//!
//! Steps run in order and stop at the first failing category:
//! 1. path parameters (declared schema, else the empty-object schema),
//! 2. query (`"true"`/`"false"` become booleans when a schema is declared;
//!    a repeated key such as `?tag=a&tag=b` becomes an array `["a", "b"]`),
//! 3. body, only for `application/json` requests with a declared schema.
//!
//! Header schemas are part of the contract but are not enforced here.
//! Non-JSON or undocumented bodies are never read, so the payload reaches the
//! handler untouched.

use crate::contract::Endpoint;
use crate::error::{AppError, AppResult};
use crate::schema::{self, ValidationError};
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::body::EitherBody;
use actix_web::web::{self, Bytes};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Which part of the request failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Path parameters.
    Path,
    /// Query string.
    Query,
    /// JSON body.
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Body => "body",
        })
    }
}

/// A request rejected by the contract.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RequestValidationError {
    /// The failing category.
    pub location: Location,
    /// The raw failure reported by the schema.
    #[serde(flatten)]
    pub error: ValidationError,
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request {}: {}", self.location, self.error)
    }
}

impl std::error::Error for RequestValidationError {}

/// Turns a rejected request into the response sent instead of calling the handler.
pub type ErrorHandler =
    Arc<dyn Fn(&RequestValidationError, &HttpRequest) -> HttpResponse + Send + Sync>;

/// Responds `400 Bad Request` with `{"location": .., "issues": [..]}`.
pub fn default_error_handler(failure: &RequestValidationError, _req: &HttpRequest) -> HttpResponse {
    HttpResponse::BadRequest().json(failure)
}

/// The raw inputs of one request, as seen before validation.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Matched path parameters, values as strings.
    pub path: Map<String, Value>,
    /// The undecoded query string (without `?`).
    pub query: String,
    /// Body bytes. Only present when the body is subject to validation.
    pub json_body: Option<Bytes>,
}

/// The validated inputs handed to business handlers.
///
/// Registered handlers receive it as an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    /// Validated path parameters.
    pub path: Value,
    /// Validated query.
    pub query: Value,
    /// Validated JSON body. `None` when the body was not subject to validation.
    pub body: Option<Value>,
}

impl ValidatedInput {
    /// Deserializes the path parameters.
    pub fn path_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_value(self.path.clone())?)
    }

    /// Deserializes the query.
    pub fn query_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_value(self.query.clone())?)
    }

    /// Deserializes the body.
    pub fn body_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| AppError::General("Request carries no validated body".into()))?;
        Ok(serde_json::from_value(body)?)
    }
}

impl FromRequest for ValidatedInput {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<ValidatedInput>()
                .cloned()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError(
                        "Route was not registered through the contract router",
                    )
                }),
        )
    }
}

/// Whether the body of a request with `content_type` must be read and validated.
pub fn wants_json_body(endpoint: &Endpoint, content_type: &str) -> bool {
    endpoint.request.is_some() && content_type.eq_ignore_ascii_case("application/json")
}

/// Turns query values that are exactly `"true"` or `"false"` into booleans.
pub fn coerce_query_booleans(query: Map<String, Value>) -> Map<String, Value> {
    fn coerce(value: Value) -> Value {
        match value {
            Value::String(s) if s == "true" => Value::Bool(true),
            Value::String(s) if s == "false" => Value::Bool(false),
            Value::Array(items) => Value::Array(items.into_iter().map(coerce).collect()),
            other => other,
        }
    }

    query
        .into_iter()
        .map(|(key, value)| (key, coerce(value)))
        .collect()
}

fn parse_query(query: &str) -> Result<Map<String, Value>, ValidationError> {
    let pairs = web::Query::<Vec<(String, String)>>::from_query(query)
        .map_err(|e| ValidationError::new(format!("malformed query string: {}", e)))?;
    let mut query = Map::new();
    for (key, value) in pairs.into_inner() {
        let value = Value::String(value);
        match query.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                query.insert(key, value);
            }
        }
    }
    Ok(query)
}

fn parse_json_body(bytes: &[u8]) -> Result<Value, ValidationError> {
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| ValidationError::new(format!("malformed JSON: {}", e)))
}

/// Runs the validation steps, in order, over a raw request.
pub fn validate_request(
    endpoint: &Endpoint,
    raw: &RawRequest,
) -> Result<ValidatedInput, RequestValidationError> {
    let fail = |location| move |error| RequestValidationError { location, error };

    let path_schema = endpoint
        .parameters
        .path
        .clone()
        .unwrap_or_else(schema::empty_object);
    let path = path_schema
        .validate(&Value::Object(raw.path.clone()))
        .map_err(fail(Location::Path))?;

    let query = parse_query(&raw.query).map_err(fail(Location::Query))?;
    let query = match &endpoint.parameters.query {
        Some(query_schema) => query_schema.validate(&Value::Object(coerce_query_booleans(query))),
        None => schema::empty_object().validate(&Value::Object(query)),
    }
    .map_err(fail(Location::Query))?;

    let body = match (&endpoint.request, &raw.json_body) {
        (Some(body_schema), Some(bytes)) => Some(
            parse_json_body(bytes)
                .and_then(|value| body_schema.validate(&value))
                .map_err(fail(Location::Body))?,
        ),
        _ => None,
    };

    Ok(ValidatedInput { path, query, body })
}

/// Middleware factory validating requests against one endpoint.
pub struct RequestValidation {
    endpoint: Arc<Endpoint>,
    error_handler: ErrorHandler,
}

impl RequestValidation {
    /// Creates the validator for `endpoint`, answering failures with `error_handler`.
    pub fn new(endpoint: Arc<Endpoint>, error_handler: ErrorHandler) -> Self {
        Self {
            endpoint,
            error_handler,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestValidation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequestValidationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestValidationMiddleware {
            service: Rc::new(service),
            endpoint: Arc::clone(&self.endpoint),
            error_handler: Arc::clone(&self.error_handler),
        }))
    }
}

/// Service produced by [`RequestValidation`].
pub struct RequestValidationMiddleware<S> {
    service: Rc<S>,
    endpoint: Arc<Endpoint>,
    error_handler: ErrorHandler,
}

impl<S, B> Service<ServiceRequest> for RequestValidationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let endpoint = Arc::clone(&self.endpoint);
        let error_handler = Arc::clone(&self.error_handler);

        Box::pin(async move {
            let json_body = if wants_json_body(&endpoint, req.content_type()) {
                Some(req.extract::<Bytes>().await?)
            } else {
                None
            };

            let raw = RawRequest {
                path: req
                    .match_info()
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                    .collect(),
                query: req.query_string().to_string(),
                json_body,
            };

            match validate_request(&endpoint, &raw) {
                Ok(input) => {
                    if let (Some(_), Some(body)) = (&raw.json_body, &input.body) {
                        let bytes = serde_json::to_vec(body)
                            .map_err(actix_web::error::ErrorInternalServerError)?;
                        req.set_payload(Payload::from(Bytes::from(bytes)));
                    }
                    req.extensions_mut().insert(input);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(failure) => {
                    tracing::warn!(
                        method = %req.method(),
                        path = req.path(),
                        location = %failure.location,
                        error = %failure.error,
                        "request rejected by contract"
                    );
                    let response = error_handler(&failure, req.request());
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
