pub mod books;
pub mod models;

// Re-exports
pub use models::*;

use axum::{extract::State, Json};

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        total_books: state.storage.count().await,
    })
}
