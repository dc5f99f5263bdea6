//! HTTP routes served over the in-memory store

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use bookshelf_server::{
    api::rate_limit,
    config::RateLimitConfig,
    models::{id::UserId, user::Role},
    repository::memory::MemoryStore,
};

use crate::common::{app, member_token, token_for, Library, ALICE, BOB, OWNER};

fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app(&MemoryStore::new(), None);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, request(Method::GET, "/api/v1/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_lending_requires_bearer_token() {
    let library = Library::new();
    let book = library.shared_book(OWNER, "Solaris").await;
    let app = app(&library.store, None);
    let uri = format!("/api/v1/books/{}/borrow", book.id);

    let (status, body) = send(&app, request(Method::POST, &uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = send(&app, request(Method::POST, &uri, Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let no_roles = token_for(ALICE, vec![]);
    let (status, _) = send(&app, request(Method::POST, &uri, Some(&no_roles))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(library.store.loans().await.is_empty());
}

#[tokio::test]
async fn test_full_lending_cycle_over_http() {
    let library = Library::new();
    let book = library.shared_book(OWNER, "Solaris").await;
    let app = app(&library.store, None);
    let alice = member_token(ALICE);
    let owner = member_token(OWNER);

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/v1/books/{}/borrow", book.id), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "ACTIVE");
    assert_eq!(body["borrower_id"], 2);
    assert_eq!(body["returned"], false);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/books/borrowed", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["size"], 15);
    assert_eq!(body["items"][0]["title"], "Solaris");

    let (status, body) = send(
        &app,
        request(Method::PATCH, &format!("/api/v1/books/{}/borrow/return", book.id), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "RETURN_PENDING");

    let (status, body) = send(&app, request(Method::GET, "/api/v1/books/returned", Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["borrower_id"], 2);

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/books/{}/borrow/return/approve", book.id),
            Some(&owner),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CLOSED");
    assert_eq!(body["return_approved"], true);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/books/lent", Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["state"], "CLOSED");
}

#[tokio::test]
async fn test_rejections_carry_code_and_message() {
    let library = Library::new();
    let book = library.shared_book(OWNER, "Solaris").await;
    let app = app(&library.store, None);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/books/{}/borrow", book.id),
            Some(&member_token(OWNER)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 11);
    assert_eq!(body["error"], "OwnBook");
    assert_eq!(body["message"], "You own this book");

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/books/{}/borrow/return", book.id),
            Some(&member_token(BOB)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NotBorrowed");

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/v1/books/999/borrow", Some(&member_token(BOB))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_page_parameters_are_validated() {
    let app = app(&MemoryStore::new(), None);
    let alice = member_token(ALICE);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/books/borrowed?size=0", Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/books/lent?page=-1", Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/books/lent?page=2&size=5", Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["size"], 5);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_huge_page_index_is_rejected() {
    let app = app(&MemoryStore::new(), None);
    let alice = member_token(ALICE);

    for uri in [
        "/api/v1/books/borrowed?page=1000000000000000000",
        "/api/v1/books/returned?page=9223372036854775807&size=100",
        "/api/v1/books/lent?page=1000001",
    ] {
        let (status, body) = send(&app, request(Method::GET, uri, Some(&alice))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "BadValue");
    }

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/books/borrowed?page=1000000&size=100", Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1000000);
    assert_eq!(body["last"], true);
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let limiter = rate_limit::build(&RateLimitConfig {
        enabled: true,
        capacity: 2,
        refill_tokens: 1,
        refill_interval_secs: 120,
    });
    let app = app(&MemoryStore::new(), limiter);

    for _ in 0..2 {
        let (status, _) = send(&app, request(Method::GET, "/api/v1/health", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, request(Method::GET, "/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Another client still has a full bucket
    let other = Request::builder()
        .uri("/api/v1/health")
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, other).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_role_counts_as_member() {
    let library = Library::new();
    let book = library.shared_book(OWNER, "Solaris").await;
    let app = app(&library.store, None);
    let admin = token_for(UserId(9), vec![Role::Admin]);

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/api/v1/books/{}/borrow", book.id), Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}
