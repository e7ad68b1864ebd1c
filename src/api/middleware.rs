//! Router-wide request accounting.

use crate::api::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Count every request by response status and time it.
///
/// The in-flight gauge is raised before the request reaches its handler and
/// lowered on every exit path. If the caller disconnects and this future is
/// dropped, the request guard still finalizes the metrics.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let guard = state.metrics().track_request();

    let response = next.run(request).instrument(span.clone()).await;

    let status = response.status().as_u16();
    span.in_scope(|| {
        info!(
            status,
            latency_us = guard.elapsed().as_micros() as u64,
            "Request completed"
        )
    });
    guard.finish(status);
    response
}
