use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpServer};
use cdd_contract::{is_error_of, ApiClient, Method, RequestConfig};
use cdd_contract_web::models::{ListQuery, NewUsers, PublicUser};
use cdd_contract_web::{configure, users_contract, users_router, UserStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::TcpListener;

macro_rules! users_app {
    () => {{
        let router = users_router().unwrap();
        test::init_service(
            App::new()
                .app_data(web::Data::new(UserStore::new()))
                .configure(move |cfg| configure(&router, cfg)),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_created_user_hides_password_hash() {
    let app = users_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({"email": "ann@example.com", "password_hash": "s3cret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "ann@example.com");
    assert!(body.get("password_hash").is_none());

    let id = body["id"].as_str().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", id))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, body);
}

#[actix_web::test]
async fn test_malformed_id_rejected_as_path() {
    let app = users_app!();

    let req = test::TestRequest::get().uri("/users/42").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["location"], "path");
}

#[actix_web::test]
async fn test_missing_user_is_documented_404() {
    let app = users_app!();

    let req = test::TestRequest::delete()
        .uri("/users/00000000-0000-0000-0000-000000000000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"message": "User 00000000-0000-0000-0000-000000000000 not found"})
    );
}

#[actix_web::test]
async fn test_list_query_coerced() {
    let app = users_app!();

    for email in ["ann@a.com", "bob@b.com", "amy@a.com"] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({"email": email, "password_hash": "x"}))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/users?email=%40a.com&limit=1&newest_first=true")
        .to_request();
    let users: Vec<PublicUser> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "amy@a.com");

    let req = test::TestRequest::get().uri("/users?limit=many").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_numeric_email_filter_next_to_limit() {
    let app = users_app!();

    for email in ["123", "1234", "456"] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({"email": email, "password_hash": "x"}))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/users?email=123&limit=5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<PublicUser> = test::read_body_json(resp).await;
    let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["123", "1234"]);
}

#[actix_web::test]
async fn test_non_json_body_is_unsupported_media_type() {
    let app = users_app!();

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("email=ann@example.com")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"message": "Expected an application/json body"}));
}

#[actix_web::test]
async fn test_patch_conflict_and_update() {
    let app = users_app!();

    let mut ids = Vec::new();
    for email in ["ann@example.com", "bob@example.com"] {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(json!({"email": email, "password_hash": "x"}))
            .to_request();
        let user: PublicUser = test::call_and_read_body_json(&app, req).await;
        ids.push(user.id);
    }

    let req = test::TestRequest::patch()
        .uri(&format!("/users/{}", ids[0]))
        .set_json(json!({"email": "bob@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::patch()
        .uri(&format!("/users/{}", ids[0]))
        .set_json(json!({"email": "cat@example.com"}))
        .to_request();
    let user: PublicUser = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user.email, "cat@example.com");
}

#[actix_web::test]
async fn test_health_not_intercepted() {
    let app = users_app!();

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, web::Bytes::from_static(b"OK"));
}

#[actix_web::test]
async fn test_client_round_trip() {
    let router = users_router().unwrap();
    let store = web::Data::new(UserStore::new());
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = HttpServer::new(move || {
        let router = router.clone();
        App::new()
            .app_data(store.clone())
            .configure(move |cfg| configure(&router, cfg))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let client = ApiClient::new(&format!("http://127.0.0.1:{}", port))
        .unwrap()
        .with_contract(users_contract().unwrap());

    let new = NewUsers {
        email: "ann@example.com".into(),
        password_hash: "x".into(),
    };
    let created: PublicUser = client
        .post("/users", RequestConfig::new().body(&new).unwrap())
        .await
        .unwrap()
        .json()
        .unwrap();

    let err = client
        .post("/users", RequestConfig::new().body(&new).unwrap())
        .await
        .unwrap_err();
    assert!(is_error_of(&err, Method::Post, "/users", 409));
    let body = client
        .error_body(&err, Method::Post, "/users", 409)
        .unwrap()
        .unwrap();
    assert_eq!(body["message"], "Email 'ann@example.com' is already registered");

    let query = ListQuery {
        email: Some("ann".into()),
        ..ListQuery::default()
    };
    let listed: Vec<PublicUser> = client
        .get("/users", RequestConfig::new().query(&query).unwrap())
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let resp = client
        .delete("/users/:id", RequestConfig::new().path_param("id", created.id.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status, 204);

    let err = client
        .get("/users/:id", RequestConfig::new().path_param("id", created.id.to_string()))
        .await
        .unwrap_err();
    assert!(is_error_of(&err, Method::Get, "/users/:id", 404));

    handle.stop(true).await;
}
