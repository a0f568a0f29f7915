//! Bookshelf REST API: a personal book catalogue over a JSON-lines
//! document collection.

pub mod api;
pub mod config;
pub mod storage;

use crate::api::{health_handler, AppState};
use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router with its middleware
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .merge(api::books::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
