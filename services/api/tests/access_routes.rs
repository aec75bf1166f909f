//! Anonymous and malformed requests on the HTTP surface.
//!
//! Every request here is refused before a query runs, so the pool stays
//! unconnected. Checks that need a stored user live in `database_flows.rs`.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{lazy_pool, router, send, test_state};

#[tokio::test]
async fn anonymous_review_is_unauthorized() {
    let state = test_state(lazy_pool());
    let (status, _) = send(
        &router(&state),
        Method::POST,
        "/api/v1/titles/1/reviews/",
        None,
        Some(json!({ "text": "Great", "score": 9 })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_bearer_token_is_unauthorized() {
    let state = test_state(lazy_pool());
    let (status, _) = send(
        &router(&state),
        Method::GET,
        "/api/v1/categories/",
        Some("not.a.token"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_user_list_is_unauthorized() {
    let state = test_state(lazy_pool());
    let (status, _) = send(&router(&state), Method::GET, "/api/v1/users/", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_profile_is_unauthorized() {
    let state = test_state(lazy_pool());
    let (status, _) = send(&router(&state), Method::GET, "/api/v1/users/me/", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_is_served_under_api_prefix() {
    let state = test_state(lazy_pool());
    let (status, body) = send(
        &router(&state),
        Method::POST,
        "/api/v1/auth/signup/",
        None,
        Some(json!({ "email": "me@yamdb.fake", "username": "me" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
}

#[tokio::test]
async fn page_zero_is_not_found() {
    let state = test_state(lazy_pool());
    let (status, _) = send(
        &router(&state),
        Method::GET,
        "/api/v1/categories/?page=0",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let state = test_state(lazy_pool());
    let (status, body) = send(&router(&state), Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], "unreachable");
}
