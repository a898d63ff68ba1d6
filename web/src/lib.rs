#![deny(missing_docs)]

//! # CDD Contract Web
//!
//! A users service whose routes are registered through the contract router.

use actix_web::{get, HttpResponse, Responder};

/// Users API contract and handlers.
pub mod api;

/// Stored records and DTOs.
pub mod models;

/// In-memory user storage.
pub mod store;

pub use api::{configure, users_contract, users_router};
pub use store::UserStore;

/// A simple health check handler.
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(App::new().service(health_check)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
