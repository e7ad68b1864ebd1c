//! Portable logistic artifact.
//!
//! A JSON file holding one weight per standardized feature plus a bias.
//! Scores without the ONNX runtime, which makes it the artifact of choice
//! for fixtures and CPU-only deployments.

use crate::error::{InferenceError, LoadError};
use crate::models::inference::Scorer;
use crate::preprocessing::FeatureMatrix;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f32>,
    bias: f32,
}

impl LogisticModel {
    pub fn new(weights: Vec<f32>, bias: f32) -> Result<Self, String> {
        if weights.is_empty() {
            return Err("logistic model has no weights".to_string());
        }
        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err("logistic model has non-finite coefficients".to_string());
        }
        Ok(Self { weights, bias })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::malformed(path, e))?;
        let parsed: LogisticModel =
            serde_json::from_str(&raw).map_err(|e| LoadError::malformed(path, e))?;
        let model =
            Self::new(parsed.weights, parsed.bias).map_err(|r| LoadError::malformed(path, r))?;

        info!(
            path = %path.display(),
            features = model.weights.len(),
            "Logistic model loaded successfully"
        );
        Ok(model)
    }

    /// The logit is accumulated in `f64` so saturated inputs cannot
    /// overflow into `inf - inf`.
    fn probability(&self, row: &[f32]) -> f32 {
        let logit: f64 = row
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| f64::from(*x) * f64::from(*w))
            .sum::<f64>()
            + f64::from(self.bias);
        sigmoid(logit) as f32
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl Scorer for LogisticModel {
    fn score(&self, batch: &FeatureMatrix) -> Result<Vec<f32>, InferenceError> {
        if batch.width() != self.weights.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.weights.len(),
                actual: batch.width(),
            });
        }
        Ok(batch
            .as_slice()
            .chunks(batch.width())
            .map(|row| self.probability(row))
            .collect())
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn model_type(&self) -> &str {
        "Logistic Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_each_row() {
        let model = LogisticModel::new(vec![1.0, -1.0], 0.0).unwrap();
        let batch = FeatureMatrix::new(3, 2, vec![0.0, 0.0, 2.0, 0.0, 0.0, 2.0]).unwrap();

        let scores = model.score(&batch).unwrap();

        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 0.5).abs() < 1e-6);
        assert!(scores[1] > 0.85);
        assert!(scores[2] < 0.15);
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_inputs() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let model = LogisticModel::new(vec![1.0; 3], 0.0).unwrap();
        let batch = FeatureMatrix::new(1, 2, vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            model.score(&batch),
            Err(InferenceError::ShapeMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_rejects_empty_weights() {
        assert!(LogisticModel::new(Vec::new(), 0.0).is_err());
    }

    #[test]
    fn test_saturated_inputs_stay_finite() {
        let model = LogisticModel::new(vec![-0.5, 0.4], 0.0).unwrap();
        let batch = FeatureMatrix::new(1, 2, vec![f32::MAX, f32::MAX]).unwrap();

        let scores = model.score(&batch).unwrap();

        assert_eq!(scores, vec![0.0]);
    }
}
