#![deny(missing_docs)]

//! # Contract Router
//!
//! Wraps actix-web route registration so that every route declared in the
//! [`Contract`] is guarded by request validation and, optionally, response
//! validation.
//!
//! ```ignore
//! let router = ContractRouter::new(contract, RouterOptions::default().with_response_validation(true));
//! App::new().configure(|cfg| {
//!     router
//!         .registrar(cfg)
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//! })
//! ```
//!
//! Routes absent from the contract (and everything passed to `mount`) are
//! registered exactly as plain actix routes.

pub mod interceptor;
pub mod validator;

use crate::contract::{to_actix_path, Contract, Method};
use actix_web::dev::HttpServiceFactory;
use actix_web::middleware::Condition;
use actix_web::{guard, web, FromRequest, Handler, HttpRequest, HttpResponse, Responder};
use std::fmt;
use std::sync::Arc;

pub use interceptor::{out_of_spec_body, ResponseValidation};
pub use validator::{
    default_error_handler, ErrorHandler, Location, RequestValidation, RequestValidationError,
    ValidatedInput,
};

/// Settings of a [`ContractRouter`].
#[derive(Clone)]
pub struct RouterOptions {
    /// Whether outgoing JSON bodies are checked against the contract.
    pub attach_response_validator: bool,
    /// Builds the response for requests rejected by validation.
    pub error_handler: ErrorHandler,
}

impl RouterOptions {
    /// Enables or disables response validation.
    pub fn with_response_validation(mut self, enabled: bool) -> Self {
        self.attach_response_validator = enabled;
        self
    }

    /// Replaces the handler answering rejected requests.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestValidationError, &HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            attach_response_validator: false,
            error_handler: Arc::new(default_error_handler),
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("attach_response_validator", &self.attach_response_validator)
            .finish_non_exhaustive()
    }
}

/// A contract plus the options used when registering routes against it.
///
/// Cheap to clone; the contract is shared.
#[derive(Debug, Clone)]
pub struct ContractRouter {
    contract: Arc<Contract>,
    options: RouterOptions,
}

impl ContractRouter {
    /// Creates a router over `contract`.
    pub fn new(contract: impl Into<Arc<Contract>>, options: RouterOptions) -> Self {
        Self {
            contract: contract.into(),
            options,
        }
    }

    /// The contract routes are checked against.
    pub fn contract(&self) -> &Arc<Contract> {
        &self.contract
    }

    /// The registration options.
    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Wraps an actix service config for registration.
    pub fn registrar<'a>(&'a self, cfg: &'a mut web::ServiceConfig) -> RouteRegistrar<'a> {
        RouteRegistrar { router: self, cfg }
    }
}

/// Registers handlers on an actix [`web::ServiceConfig`], splicing in validation
/// for routes the contract declares.
pub struct RouteRegistrar<'a> {
    router: &'a ContractRouter,
    cfg: &'a mut web::ServiceConfig,
}

impl RouteRegistrar<'_> {
    /// Registers `handler` for (method, path).
    ///
    /// `path` uses contract syntax (`/users/:id`).
    pub fn handle<F, Args>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        let actix_path = to_actix_path(path);

        let Some(endpoint) = self.router.contract.endpoint(path, method) else {
            tracing::debug!(%method, path, "registering route outside the contract");
            self.cfg
                .route(&actix_path, web::method(method.to_actix()).to(handler));
            return self;
        };

        let options = &self.router.options;
        tracing::debug!(
            %method,
            path,
            response_validation = options.attach_response_validator,
            "registering contract route"
        );

        // Outermost wrap runs first: request validation, then response validation.
        let resource = web::resource(actix_path)
            .guard(guard::Method(method.to_actix()))
            .route(web::route().to(handler))
            .wrap(Condition::new(
                options.attach_response_validator,
                ResponseValidation::new(Arc::clone(endpoint)),
            ))
            .wrap(RequestValidation::new(
                Arc::clone(endpoint),
                Arc::clone(&options.error_handler),
            ));
        self.cfg.service(resource);
        self
    }

    /// Registers a `GET` handler.
    pub fn get<F, Args>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        self.handle(Method::Get, path, handler)
    }

    /// Registers a `POST` handler.
    pub fn post<F, Args>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        self.handle(Method::Post, path, handler)
    }

    /// Registers a `PUT` handler.
    pub fn put<F, Args>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        self.handle(Method::Put, path, handler)
    }

    /// Registers a `PATCH` handler.
    pub fn patch<F, Args>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        self.handle(Method::Patch, path, handler)
    }

    /// Registers a `DELETE` handler.
    pub fn delete<F, Args>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Handler<Args>,
        Args: FromRequest + 'static,
        F::Output: Responder + 'static,
    {
        self.handle(Method::Delete, path, handler)
    }

    /// Registers any actix service (scope, resource, files...) without interception.
    pub fn mount<F>(&mut self, factory: F) -> &mut Self
    where
        F: HttpServiceFactory + 'static,
    {
        self.cfg.service(factory);
        self
    }
}
