//! HTTP API server

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/v1",
            Router::new()
                .route("/query", post(handlers::query))
                .route("/query-vector", post(handlers::query_vector))
                .route("/graphs", get(handlers::graphs)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
