#![deny(missing_docs)]

//! # CDD Contract Web Binary
//!
//! Serves the users API.
//!
//! - `CDD_WEB_BIND`: listen address, default `127.0.0.1:8080`.
//! - `CDD_WEB_ONESHOT`: stop right after binding.
//! - `RUST_LOG`: tracing filter, default `info`.

use actix_web::{web, App, HttpServer};
use cdd_contract_web::{configure, users_router, UserStore};
use std::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn build_server(listener: TcpListener) -> std::io::Result<actix_web::dev::Server> {
    let router = users_router().map_err(std::io::Error::other)?;
    let store = web::Data::new(UserStore::new());
    Ok(HttpServer::new(move || {
        let router = router.clone();
        App::new()
            .app_data(store.clone())
            .configure(move |cfg| configure(&router, cfg))
    })
    .listen(listener)?
    .run())
}

fn resolve_bind_addr() -> String {
    std::env::var("CDD_WEB_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignored when a subscriber is already installed.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let bind_addr = resolve_bind_addr();
    let listener = TcpListener::bind(&bind_addr)?;
    tracing::info!(addr = %bind_addr, "listening");
    let server = build_server(listener)?;

    if std::env::var("CDD_WEB_ONESHOT").is_ok() {
        server.handle().stop(true).await;
    }

    server.await
}
