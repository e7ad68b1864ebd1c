//! HTTP surface of the scoring service

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod state;

pub use responses::{ApiError, ErrorBody, HealthResponse, ModelInfo};
pub use state::AppState;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

/// Build the service router. Every request, including unmatched paths, is
/// counted by [`middleware::track_requests`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model/info", get(handlers::model_info))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn_with_state(state.clone(), middleware::track_requests))
        .with_state(state)
}
