//! Route handlers.
//!
//! Prediction routes run inside [`run_prediction`], which owns the optional
//! timeout. Request metrics are recorded by the router-wide
//! [`track_requests`](crate::api::middleware::track_requests) layer.

use crate::api::responses::{ApiError, HealthResponse, ModelInfo, RootResponse};
use crate::api::state::AppState;
use crate::error::{InferenceError, ValidationError};
use crate::types::{
    BatchPayload, BatchPredictionResult, CreditApplication, CreditApplicationPayload,
    FEATURE_COUNT,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::future::Future;
use tracing::{error, info, warn};

/// Run the prediction work under the optional request timeout and turn
/// failures into error responses.
async fn run_prediction<F>(state: &AppState, work: F) -> Response
where
    F: Future<Output = Result<Response, ApiError>>,
{
    let outcome = match state.config().server.request_timeout() {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(ApiError::Timeout)),
        None => work.await,
    };

    match outcome {
        Ok(response) => response,
        Err(err) => {
            if err.status().is_server_error() {
                error!(error = ?err, status = err.status().as_u16(), "Request failed");
            } else {
                warn!(error = ?err, status = err.status().as_u16(), "Request rejected");
            }
            err.into_response()
        }
    }
}

fn malformed(rejection: JsonRejection) -> ValidationError {
    ValidationError::MalformedBody(rejection.body_text())
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Credit Scoring API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/health".to_string(),
        metrics: "/metrics".to_string(),
        endpoints: ["/predict", "/predict/batch", "/model/info"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.is_ready() {
        "healthy"
    } else {
        "unhealthy"
    };
    Json(HealthResponse {
        status: status.to_string(),
        model_loaded: state.model_loaded(),
        scaler_loaded: state.scaler_loaded(),
        timestamp: Utc::now(),
    })
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    let model_type = state
        .service()
        .map(|service| service.model_type().to_string())
        .unwrap_or_else(|_| "not loaded".to_string());

    Json(ModelInfo {
        model_version: state.config().model.version.clone(),
        model_type,
        optimization: state.config().model.optimization.clone(),
        input_features: FEATURE_COUNT,
        output_classes: 2,
    })
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics().render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.metrics().content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<CreditApplicationPayload>, JsonRejection>,
) -> Response {
    run_prediction(&state, async {
        let Json(payload) = payload.map_err(malformed)?;
        let application = CreditApplication::validate(&payload)?;
        let service = state.service()?;

        let result = service
            .predict_batch_blocking(vec![application])
            .await?
            .pop()
            .ok_or(InferenceError::OutputLength {
                expected: 1,
                actual: 0,
            })?;

        state.metrics().record_prediction(result.prediction.label());
        info!(
            prediction = result.prediction.as_u8(),
            probability = result.probability,
            risk_level = %result.risk_level,
            "Prediction"
        );

        Ok::<Response, ApiError>(Json(result).into_response())
    })
    .await
}

pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchPayload>, JsonRejection>,
) -> Response {
    run_prediction(&state, async {
        let Json(payload) = payload.map_err(malformed)?;
        let payloads = payload
            .applications
            .ok_or(ValidationError::MissingField {
                field: "applications",
            })?;
        let applications =
            CreditApplication::validate_batch(&payloads, state.config().server.max_batch_size)?;
        let service = state.service()?;

        let predictions = service.predict_batch_blocking(applications).await?;

        for result in &predictions {
            state.metrics().record_prediction(result.prediction.label());
        }
        info!(batch_size = predictions.len(), "Batch prediction completed");

        Ok::<Response, ApiError>(Json(BatchPredictionResult::new(predictions)).into_response())
    })
    .await
}
