//! Integration tests for the health endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{add_book, body_json, book_body, build_test_app, get};
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_book_count() {
    let (app, _dir) = build_test_app().await;
    add_book(&app, book_body("Counted", 10, 1, true)).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
    assert_eq!(json["totalBooks"], 1);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _dir) = build_test_app().await;

    let response = get(&app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (app, _dir) = build_test_app().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/books")
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
