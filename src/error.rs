//! Error taxonomy for the scoring service.
//!
//! Validation errors are caller-caused and recoverable. Load and config
//! integrity errors are fatal at startup. Inference errors are reported per
//! request and never retried.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A credit application (or batch) that failed the input contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("field `{field}` is required")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be an integer, got {value}")]
    NotAnInteger { field: &'static str, value: f64 },

    #[error("field `{field}` is out of range: got {value}, expected {constraint}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error("batch must contain at least one application")]
    EmptyBatch,

    #[error("batch of {size} applications exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("application {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Name of the offending field, looking through batch item wrappers.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::NotAnInteger { field, .. }
            | Self::OutOfRange { field, .. } => Some(field),
            Self::Item { source, .. } => source.field(),
            _ => None,
        }
    }

    /// The rejected value, when one was received.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::NotAnInteger { value, .. } | Self::OutOfRange { value, .. } => Some(*value),
            Self::Item { source, .. } => source.value(),
            _ => None,
        }
    }

    /// Human readable description of the violated constraint.
    pub fn constraint(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { .. } => Some("required"),
            Self::NotAnInteger { .. } => Some("integer"),
            Self::OutOfRange { constraint, .. } => Some(constraint),
            Self::EmptyBatch => Some("non-empty"),
            Self::Item { source, .. } => source.constraint(),
            _ => None,
        }
    }

    /// Batch position of the offending application.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Item { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn at(self, index: usize) -> Self {
        Self::Item {
            index,
            source: Box::new(self),
        }
    }
}

/// Failure to load the model artifact or the scaling parameters.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed artifact {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("incompatible artifact {}: {reason}", path.display())]
    Incompatible { path: PathBuf, reason: String },

    #[error("inference runtime unavailable: {0}")]
    Runtime(String),
}

impl LoadError {
    pub(crate) fn malformed(path: &Path, reason: impl ToString) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn incompatible(path: &Path, reason: impl ToString) -> Self {
        Self::Incompatible {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Runtime scoring failure for a single request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("input width mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model returned {actual} probabilities for {expected} rows")]
    OutputLength { expected: usize, actual: usize },

    #[error("model returned a non-finite probability for row {row}")]
    NonFinite { row: usize },

    #[error("inference backend error: {0}")]
    Backend(String),

    #[error("scoring task aborted: {0}")]
    TaskFailed(String),
}

/// Disagreement between the scaler, the feature contract and the model.
#[derive(Debug, Error)]
pub enum ConfigIntegrityError {
    #[error("scaler has {scaler_width} features, the feature contract has {expected}")]
    ScalerWidth { scaler_width: usize, expected: usize },

    #[error("model expects {model_width} inputs, the scaler produces {scaler_width}")]
    ModelWidth {
        model_width: usize,
        scaler_width: usize,
    },

    #[error("startup self-check failed: {0}")]
    SelfCheck(#[from] InferenceError),
}

/// Fatal error raised while bringing the service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load scaler: {0}")]
    Scaler(#[source] LoadError),

    #[error("failed to load model: {0}")]
    Model(#[source] LoadError),

    #[error(transparent)]
    Integrity(#[from] ConfigIntegrityError),
}

/// Per-request pipeline failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("service not ready: {0} not loaded")]
    NotReady(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_error_exposes_inner_details() {
        let err = ValidationError::OutOfRange {
            field: "age",
            value: 150.0,
            constraint: "18 <= age <= 100",
        }
        .at(3);

        assert_eq!(err.index(), Some(3));
        assert_eq!(err.field(), Some("age"));
        assert_eq!(err.value(), Some(150.0));
        assert_eq!(err.constraint(), Some("18 <= age <= 100"));
        assert!(err.to_string().starts_with("application 3:"));
    }

    #[test]
    fn test_empty_batch_has_no_field() {
        let err = ValidationError::EmptyBatch;
        assert_eq!(err.field(), None);
        assert_eq!(err.constraint(), Some("non-empty"));
    }
}
