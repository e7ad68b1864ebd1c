//! Inference engine for credit default scoring

use crate::error::{InferenceError, LoadError};
use crate::models::loader::{ModelLoader, OnnxModel};
use crate::preprocessing::FeatureMatrix;
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info, warn};

/// A loaded scoring artifact.
///
/// Implementations must be safe to call from many request tasks at once,
/// either because scoring is reentrant or because they serialize internally.
pub trait Scorer: Send + Sync {
    /// Score a standardized batch, one default probability per row.
    fn score(&self, batch: &FeatureMatrix) -> Result<Vec<f32>, InferenceError>;

    /// Feature width declared by the artifact, if it records one.
    fn input_width(&self) -> Option<usize>;

    /// Model family reported by `/model/info`.
    fn model_type(&self) -> &str;
}

/// Owns the scoring artifact for the lifetime of the process.
pub struct InferenceEngine {
    scorer: Box<dyn Scorer>,
}

impl InferenceEngine {
    /// Wrap an already loaded scorer
    pub fn new(scorer: impl Scorer + 'static) -> Self {
        Self::from_boxed(Box::new(scorer))
    }

    pub fn from_boxed(scorer: Box<dyn Scorer>) -> Self {
        Self { scorer }
    }

    /// Load the artifact at `path`
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self, LoadError> {
        let scorer = ModelLoader::with_threads(onnx_threads).load(path)?;
        info!(
            model_type = scorer.model_type(),
            input_width = ?scorer.input_width(),
            "Inference engine initialized"
        );
        Ok(Self::from_boxed(scorer))
    }

    pub fn input_width(&self) -> Option<usize> {
        self.scorer.input_width()
    }

    pub fn model_type(&self) -> &str {
        self.scorer.model_type()
    }

    /// Score a batch. The result has exactly one probability per input row,
    /// in row order.
    pub fn score(&self, batch: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        if let Some(expected) = self.input_width() {
            if expected != batch.width() {
                return Err(InferenceError::ShapeMismatch {
                    expected,
                    actual: batch.width(),
                });
            }
        }
        if batch.rows() == 0 {
            return Ok(Vec::new());
        }

        let raw = self.scorer.score(batch)?;
        if raw.len() != batch.rows() {
            return Err(InferenceError::OutputLength {
                expected: batch.rows(),
                actual: raw.len(),
            });
        }

        let probabilities = raw
            .into_iter()
            .enumerate()
            .map(|(row, p)| {
                if p.is_finite() {
                    Ok(f64::from(p).clamp(0.0, 1.0))
                } else {
                    Err(InferenceError::NonFinite { row })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = batch.rows(), "Batch scored");
        Ok(probabilities)
    }
}

impl Scorer for OnnxModel {
    fn score(&self, batch: &FeatureMatrix) -> Result<Vec<f32>, InferenceError> {
        let input_tensor = Tensor::from_array((batch.shape(), batch.as_slice().to_vec()))
            .map_err(|e| InferenceError::Backend(format!("failed to create input tensor: {}", e)))?;

        // Scoring keeps no state in the session between runs, so a
        // poisoned lock is still usable.
        let mut session = self.session.lock().unwrap_or_else(|poisoned| {
            warn!(model = %self.name, "Session lock poisoned, recovering");
            poisoned.into_inner()
        });

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| {
                InferenceError::Backend(format!("model produced no `{}` output", self.output_name))
            })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Backend(format!("tensor extraction failed: {}", e)))?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        probabilities_from_tensor(&dims, data, batch.rows())
    }

    fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    fn model_type(&self) -> &str {
        "ONNX Neural Network"
    }
}

/// Pull the default-class probability for each row out of a model output.
///
/// Accepts `[rows]` and `[rows, 1]` sigmoid outputs as well as
/// `[rows, classes]` probability tables, where class 1 is default.
fn probabilities_from_tensor(
    dims: &[i64],
    data: &[f32],
    rows: usize,
) -> Result<Vec<f32>, InferenceError> {
    let unexpected = || InferenceError::Backend(format!("unexpected output shape {:?}", dims));

    match dims {
        [n] | [n, 1] if *n as usize == rows => Ok(data.to_vec()),
        [n, classes] if *n as usize == rows && *classes >= 2 => Ok(data
            .chunks(*classes as usize)
            .map(|class_probs| class_probs[1])
            .collect()),
        [n] | [n, _] => Err(InferenceError::OutputLength {
            expected: rows,
            actual: (*n).max(0) as usize,
        }),
        _ => Err(unexpected()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(Vec<f32>);

    impl Scorer for FixedScorer {
        fn score(&self, _batch: &FeatureMatrix) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }

        fn input_width(&self) -> Option<usize> {
            Some(2)
        }

        fn model_type(&self) -> &str {
            "fixed"
        }
    }

    fn batch(rows: usize) -> FeatureMatrix {
        FeatureMatrix::new(rows, 2, vec![0.0; rows * 2]).unwrap()
    }

    #[test]
    fn test_score_preserves_order() {
        let engine = InferenceEngine::new(FixedScorer(vec![0.1, 0.9, 0.4]));
        let scores = engine.score(&batch(3)).unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 0.1).abs() < 1e-6);
        assert!((scores[1] - 0.9).abs() < 1e-6);
        assert!((scores[2] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_output_length_mismatch() {
        let engine = InferenceEngine::new(FixedScorer(vec![0.1]));
        assert_eq!(
            engine.score(&batch(2)),
            Err(InferenceError::OutputLength {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_non_finite_output() {
        let engine = InferenceEngine::new(FixedScorer(vec![0.2, f32::NAN]));
        assert_eq!(
            engine.score(&batch(2)),
            Err(InferenceError::NonFinite { row: 1 })
        );
    }

    #[test]
    fn test_width_mismatch() {
        let engine = InferenceEngine::new(FixedScorer(vec![0.2]));
        let wide = FeatureMatrix::new(1, 3, vec![0.0; 3]).unwrap();
        assert_eq!(
            engine.score(&wide),
            Err(InferenceError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_clamps_rounding_overshoot() {
        let engine = InferenceEngine::new(FixedScorer(vec![1.000_001]));
        assert_eq!(engine.score(&batch(1)).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_probabilities_from_tensor_shapes() {
        assert_eq!(
            probabilities_from_tensor(&[2, 1], &[0.2, 0.7], 2).unwrap(),
            vec![0.2, 0.7]
        );
        assert_eq!(
            probabilities_from_tensor(&[2], &[0.2, 0.7], 2).unwrap(),
            vec![0.2, 0.7]
        );
        assert_eq!(
            probabilities_from_tensor(&[2, 2], &[0.8, 0.2, 0.3, 0.7], 2).unwrap(),
            vec![0.2, 0.7]
        );
        assert!(probabilities_from_tensor(&[3, 1], &[0.1, 0.2, 0.3], 2).is_err());
        assert!(probabilities_from_tensor(&[1, 1, 1], &[0.1], 1).is_err());
    }
}
