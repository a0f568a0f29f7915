use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use bookshelf_api::api::AppState;
use bookshelf_api::storage::JsonlStorage;

/// Build the full router over a collection in a fresh temporary directory.
///
/// The `TempDir` must outlive the router, so callers keep it bound.
pub async fn build_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonlStorage::open(dir.path().join("books.jsonl"))
        .await
        .unwrap();

    let state = AppState {
        storage: Arc::new(storage),
    };

    (bookshelf_api::app(state), dir)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn book_body(name: &str, page_count: u32, read_page: u32, reading: bool) -> Value {
    json!({
        "name": name,
        "year": 2010,
        "author": "John Doe",
        "summary": "Lorem ipsum dolor sit amet",
        "publisher": "Dicoding Indonesia",
        "pageCount": page_count,
        "readPage": read_page,
        "reading": reading,
    })
}

/// POST a valid book and return its id
pub async fn add_book(app: &Router, body: Value) -> String {
    let response = send(app, Method::POST, "/books", Some(body)).await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["data"]["bookId"].as_str().unwrap().to_string()
}
