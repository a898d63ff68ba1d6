#![deny(missing_docs)]

//! # CDD Contract
//!
//! One declarative contract describing every endpoint of an HTTP API, enforced
//! at both ends of the wire:
//! - on an actix-web server, requests are validated before handlers run and
//!   JSON responses are checked before they leave the process;
//! - on a reqwest-based client, requests are built from path templates and
//!   failures are classified by (method, path, status).

/// Shared error types.
pub mod error;

/// Schema seam and the shipped adapters.
pub mod schema;

/// Contract model (paths, methods, endpoint descriptors).
pub mod contract;

/// Server-side route registration, request and response validation.
pub mod server;

/// Client-side request building and error classification.
pub mod client;

pub use client::{
    build_request, is_error_of, ApiClient, ApiResponse, ClientError, ErrorResponse,
    OutboundRequest, RequestConfig, ResponseBody, ResponseType,
};
pub use contract::{Contract, ContractBuilder, Endpoint, Method, Parameters, StatusKey};
pub use error::{AppError, AppResult};
pub use schema::{Issue, Schema, SchemaRef, ValidationError};
pub use server::{
    ContractRouter, Location, RequestValidationError, RouteRegistrar, RouterOptions,
    ValidatedInput,
};
