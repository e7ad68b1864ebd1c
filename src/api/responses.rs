//! Response bodies and the mapping from pipeline errors to HTTP statuses.

use crate::error::{InferenceError, ServiceError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_version: String,
    pub model_type: String,
    pub optimization: String,
    pub input_features: usize,
    pub output_classes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub health: String,
    pub metrics: String,
    pub endpoints: Vec<String>,
}

/// JSON error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ErrorBody {
    fn plain(error: &str, detail: String) -> Self {
        Self {
            error: error.to_string(),
            detail,
            field: None,
            value: None,
            constraint: None,
            index: None,
        }
    }
}

/// Every way a request handler can fail.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Service(ServiceError::Inference(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Service(ServiceError::NotReady(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Service(ServiceError::Validation(err)) => validation_body(err),
            ApiError::Service(err @ ServiceError::Inference(_)) => {
                ErrorBody::plain("inference_error", err.to_string())
            }
            ApiError::Service(err @ ServiceError::NotReady(_)) => {
                ErrorBody::plain("not_ready", err.to_string())
            }
            ApiError::Timeout => {
                ErrorBody::plain("timeout", "request exceeded the configured timeout".to_string())
            }
        }
    }
}

fn validation_body(err: &ValidationError) -> ErrorBody {
    ErrorBody {
        error: "validation_error".to_string(),
        detail: err.to_string(),
        field: err.field().map(str::to_string),
        value: err.value(),
        constraint: err.constraint().map(str::to_string),
        index: err.index(),
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        ApiError::Service(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::EmptyBatch).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(InferenceError::Backend("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ServiceError::NotReady("model")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_body_names_field() {
        let body = validation_body(&ValidationError::OutOfRange {
            field: "age",
            value: 150.0,
            constraint: "18 <= age <= 100",
        });
        assert_eq!(body.field.as_deref(), Some("age"));
        assert_eq!(body.value, Some(150.0));
        assert_eq!(body.constraint.as_deref(), Some("18 <= age <= 100"));
    }
}
