#![deny(missing_docs)]

//! # Users API
//!
//! The users contract and the handlers registered against it.

use crate::models::{ApiMessage, ListQuery, NewUsers, PublicUser, UpdateUsers, UserPath};
use crate::store::{StoreError, UserStore};
use actix_web::http::StatusCode;
use actix_web::{error, web, HttpResponse, ResponseError};
use serde::de::DeserializeOwned;
use cdd_contract::schema;
use cdd_contract::{AppResult, Contract, ContractRouter, Endpoint, Method, RouterOptions, ValidatedInput};

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::EmailTaken(_) => StatusCode::CONFLICT,
            StoreError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiMessage::new(self.to_string()))
    }
}

/// Every endpoint of the users API.
pub fn users_contract() -> AppResult<Contract> {
    let user_path = || schema::coerced::<UserPath>();
    Contract::builder()
        .endpoint(
            "/users",
            Method::Get,
            Endpoint::new()
                .query(schema::coerced::<ListQuery>())
                .response(200, schema::typed::<Vec<PublicUser>>()),
        )
        .endpoint(
            "/users",
            Method::Post,
            Endpoint::new()
                .request(schema::typed::<NewUsers>())
                .response(201, schema::typed::<PublicUser>())
                .error(409, schema::typed::<ApiMessage>())
                .error(415, schema::typed::<ApiMessage>()),
        )
        .endpoint(
            "/users/:id",
            Method::Get,
            Endpoint::new()
                .path_params(user_path())
                .response(200, schema::typed::<PublicUser>())
                .error(404, schema::typed::<ApiMessage>()),
        )
        .endpoint(
            "/users/:id",
            Method::Patch,
            Endpoint::new()
                .path_params(user_path())
                .request(schema::typed::<UpdateUsers>())
                .response(200, schema::typed::<PublicUser>())
                .error(404, schema::typed::<ApiMessage>())
                .error(409, schema::typed::<ApiMessage>())
                .error(415, schema::typed::<ApiMessage>()),
        )
        .endpoint(
            "/users/:id",
            Method::Delete,
            Endpoint::new()
                .path_params(user_path())
                .error(404, schema::typed::<ApiMessage>()),
        )
        .build()
}

/// Router over [`users_contract`] with response validation on.
pub fn users_router() -> AppResult<ContractRouter> {
    Ok(ContractRouter::new(
        users_contract()?,
        RouterOptions::default().with_response_validation(true),
    ))
}

/// Registers the users API and the health check.
pub fn configure(router: &ContractRouter, cfg: &mut web::ServiceConfig) {
    router
        .registrar(cfg)
        .get("/users", list_users)
        .post("/users", create_user)
        .get("/users/:id", get_user)
        .patch("/users/:id", update_user)
        .delete("/users/:id", delete_user)
        .mount(crate::health_check);
}

/// The validated JSON body. Only `application/json` bodies are validated, so
/// its absence means the client sent another content type.
fn json_body<T: DeserializeOwned>(input: &ValidatedInput) -> actix_web::Result<T> {
    input.body_as().map_err(|e| {
        error::InternalError::from_response(
            e,
            HttpResponse::UnsupportedMediaType()
                .json(ApiMessage::new("Expected an application/json body")),
        )
        .into()
    })
}

// Handlers answer with full `Users` records; the response validator strips
// what the contract does not publish.

async fn list_users(
    input: ValidatedInput,
    store: web::Data<UserStore>,
) -> actix_web::Result<HttpResponse> {
    let query: ListQuery = input.query_as().map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(store.list(&query)?))
}

async fn create_user(
    input: ValidatedInput,
    store: web::Data<UserStore>,
) -> actix_web::Result<HttpResponse> {
    let new: NewUsers = json_body(&input)?;
    let user = store.insert(new)?;
    tracing::debug!(id = %user.id, "user created");
    Ok(HttpResponse::Created().json(user))
}

async fn get_user(
    input: ValidatedInput,
    store: web::Data<UserStore>,
) -> actix_web::Result<HttpResponse> {
    let path: UserPath = input.path_as().map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(store.get(path.id)?))
}

async fn update_user(
    input: ValidatedInput,
    store: web::Data<UserStore>,
) -> actix_web::Result<HttpResponse> {
    let path: UserPath = input.path_as().map_err(error::ErrorInternalServerError)?;
    let changes: UpdateUsers = json_body(&input)?;
    Ok(HttpResponse::Ok().json(store.update(path.id, changes)?))
}

async fn delete_user(
    input: ValidatedInput,
    store: web::Data<UserStore>,
) -> actix_web::Result<HttpResponse> {
    let path: UserPath = input.path_as().map_err(error::ErrorInternalServerError)?;
    store.remove(path.id)?;
    tracing::debug!(id = %path.id, "user removed");
    Ok(HttpResponse::NoContent().finish())
}
