#![deny(missing_docs)]

//! # Contract Model
//!
//! The declarative description of every endpoint of an API:
//! `path -> method -> Endpoint`.
//!
//! A [`Contract`] is assembled once through [`ContractBuilder`] and is immutable
//! afterwards. Both the server router and the client share it behind an `Arc`.
//!
//! Paths use `:name` placeholders (e.g. `/users/:id`).

use crate::error::{AppError, AppResult};
use crate::schema::SchemaRef;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The fixed set of HTTP methods a contract can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Every supported method, in declaration order.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    /// Lowercase name, as used in contracts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }

    /// Server-side representation.
    pub fn to_actix(self) -> actix_web::http::Method {
        match self {
            Method::Get => actix_web::http::Method::GET,
            Method::Post => actix_web::http::Method::POST,
            Method::Put => actix_web::http::Method::PUT,
            Method::Patch => actix_web::http::Method::PATCH,
            Method::Delete => actix_web::http::Method::DELETE,
        }
    }

    /// Client-side representation.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::General(format!("Unsupported method '{}'", s)))
    }
}

/// Key of the `responses` map: a concrete status code or the `default` fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    /// An exact status code.
    Code(u16),
    /// Used when the actual code has no entry of its own.
    Default,
}

impl From<u16> for StatusKey {
    fn from(code: u16) -> Self {
        StatusKey::Code(code)
    }
}

/// Schemas for the non-body inputs of an endpoint.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    /// Path parameters (`:name` segments).
    pub path: Option<SchemaRef>,
    /// Query string parameters.
    pub query: Option<SchemaRef>,
    /// Request headers. Declared only; the server does not enforce it.
    pub header: Option<SchemaRef>,
}

/// Everything the contract says about one (path, method) pair.
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    /// Request body schema.
    pub request: Option<SchemaRef>,
    /// Path / query / header schemas.
    pub parameters: Parameters,
    /// Success-path body schemas by status.
    pub responses: IndexMap<StatusKey, SchemaRef>,
    /// Documented failure bodies by status. Used for classification only.
    pub errors: IndexMap<u16, SchemaRef>,
}

impl Endpoint {
    /// Creates an endpoint accepting nothing and documenting no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request body schema.
    pub fn request(mut self, schema: SchemaRef) -> Self {
        self.request = Some(schema);
        self
    }

    /// Sets the path parameter schema.
    pub fn path_params(mut self, schema: SchemaRef) -> Self {
        self.parameters.path = Some(schema);
        self
    }

    /// Sets the query parameter schema.
    pub fn query(mut self, schema: SchemaRef) -> Self {
        self.parameters.query = Some(schema);
        self
    }

    /// Sets the header schema.
    pub fn header(mut self, schema: SchemaRef) -> Self {
        self.parameters.header = Some(schema);
        self
    }

    /// Documents the body returned with `status`.
    pub fn response(mut self, status: impl Into<StatusKey>, schema: SchemaRef) -> Self {
        self.responses.insert(status.into(), schema);
        self
    }

    /// Documents the body returned for any status without its own entry.
    pub fn default_response(self, schema: SchemaRef) -> Self {
        self.response(StatusKey::Default, schema)
    }

    /// Documents a failure body returned with `status`.
    pub fn error(mut self, status: u16, schema: SchemaRef) -> Self {
        self.errors.insert(status, schema);
        self
    }

    /// Status codes that have an explicit response entry, in declaration order.
    pub fn documented_statuses(&self) -> Vec<u16> {
        self.responses
            .keys()
            .filter_map(|key| match key {
                StatusKey::Code(code) => Some(*code),
                StatusKey::Default => None,
            })
            .collect()
    }

    /// Whether a `default` response is declared.
    pub fn has_default_response(&self) -> bool {
        self.responses.contains_key(&StatusKey::Default)
    }

    /// Resolves the body schema for `status`: exact entry, then `default`.
    pub fn response_schema(&self, status: u16) -> Option<&SchemaRef> {
        self.responses
            .get(&StatusKey::Code(status))
            .or_else(|| self.responses.get(&StatusKey::Default))
    }

    /// Resolves the documented failure schema for `status`.
    ///
    /// Falls back to the symmetric `responses` entry at that code.
    pub fn error_schema(&self, status: u16) -> Option<&SchemaRef> {
        self.errors
            .get(&status)
            .or_else(|| self.responses.get(&StatusKey::Code(status)))
    }
}

/// Immutable mapping from path to method to [`Endpoint`].
#[derive(Debug, Clone, Default)]
pub struct Contract {
    paths: IndexMap<String, IndexMap<Method, Arc<Endpoint>>>,
}

impl Contract {
    /// Starts building a contract.
    pub fn builder() -> ContractBuilder {
        ContractBuilder::default()
    }

    /// Looks up the descriptor for (path, method).
    pub fn endpoint(&self, path: &str, method: Method) -> Option<&Arc<Endpoint>> {
        self.paths.get(path).and_then(|methods| methods.get(&method))
    }

    /// Iterates over every (path, method, endpoint) triple.
    pub fn endpoints(&self) -> impl Iterator<Item = (&str, Method, &Arc<Endpoint>)> {
        self.paths.iter().flat_map(|(path, methods)| {
            methods
                .iter()
                .map(move |(method, endpoint)| (path.as_str(), *method, endpoint))
        })
    }

    /// Number of declared endpoints.
    pub fn len(&self) -> usize {
        self.paths.values().map(IndexMap::len).sum()
    }

    /// Whether no endpoint is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates endpoints; rejects duplicate (path, method) declarations on `build`.
#[derive(Debug, Default)]
pub struct ContractBuilder {
    paths: IndexMap<String, IndexMap<Method, Arc<Endpoint>>>,
    duplicates: Vec<String>,
}

impl ContractBuilder {
    /// Declares the endpoint for (path, method).
    pub fn endpoint(mut self, path: impl Into<String>, method: Method, endpoint: Endpoint) -> Self {
        let path = path.into();
        let methods = self.paths.entry(path.clone()).or_default();
        if methods.insert(method, Arc::new(endpoint)).is_some() {
            self.duplicates.push(format!("{} {}", method, path));
        }
        self
    }

    /// Finalizes the contract.
    pub fn build(self) -> AppResult<Contract> {
        if !self.duplicates.is_empty() {
            return Err(AppError::General(format!(
                "Duplicate endpoint declaration: {}",
                self.duplicates.join(", ")
            )));
        }
        Ok(Contract { paths: self.paths })
    }
}

/// Rewrites every `:name` placeholder of a path template.
///
/// A placeholder is a `:` followed by ASCII alphanumerics or `_`. `replace`
/// returns the substitution, or `None` to keep the placeholder verbatim.
pub fn replace_placeholders<F>(template: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];
        match (name.is_empty(), replace(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Names of the `:name` placeholders in a path template.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    replace_placeholders(template, |name| {
        names.push(name.to_string());
        None
    });
    names
}

/// Translates `:name` placeholders into the `{name}` segments actix routes on.
pub fn to_actix_path(template: &str) -> String {
    replace_placeholders(template, |name| Some(format!("{{{}}}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn sample() -> Contract {
        Contract::builder()
            .endpoint(
                "/users/:id",
                Method::Get,
                Endpoint::new()
                    .response(200, schema::any())
                    .default_response(schema::any())
                    .error(404, schema::any()),
            )
            .endpoint("/users", Method::Post, Endpoint::new().request(schema::any()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup() {
        let contract = sample();
        assert!(contract.endpoint("/users/:id", Method::Get).is_some());
        assert!(contract.endpoint("/users/:id", Method::Post).is_none());
        assert!(contract.endpoint("/nope", Method::Get).is_none());
        assert_eq!(contract.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let res = Contract::builder()
            .endpoint("/a", Method::Get, Endpoint::new())
            .endpoint("/a", Method::Get, Endpoint::new())
            .build();
        let err = res.unwrap_err();
        assert_eq!(
            format!("{}", err),
            "General Error: Duplicate endpoint declaration: get /a"
        );
    }

    #[test]
    fn test_response_resolution() {
        let contract = sample();
        let endpoint = contract.endpoint("/users/:id", Method::Get).unwrap();
        assert_eq!(endpoint.documented_statuses(), vec![200]);
        assert!(endpoint.has_default_response());
        assert!(endpoint.response_schema(200).is_some());
        assert!(endpoint.response_schema(418).is_some());
        assert!(endpoint.error_schema(404).is_some());
        assert!(endpoint.error_schema(500).is_none());

        let post = contract.endpoint("/users", Method::Post).unwrap();
        assert!(post.response_schema(201).is_none());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
        assert!("options".parse::<Method>().is_err());
        assert_eq!(Method::ALL.len(), 5);
        assert_eq!(Method::Delete.to_string(), "delete");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(placeholders("/users/:id/posts/:post"), vec!["id", "post"]);
        assert_eq!(to_actix_path("/users/:id"), "/users/{id}");
        assert_eq!(to_actix_path("/users/{id}"), "/users/{id}");
        assert_eq!(to_actix_path("/"), "/");
        assert_eq!(to_actix_path("/files/:name.json"), "/files/{name}.json");
        assert_eq!(placeholders("/a:/b"), Vec::<String>::new());
    }
}
