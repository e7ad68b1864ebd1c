//! Scoring pipeline: feature extraction, standardization, inference and
//! risk classification over validated applications.

use crate::classifier::RiskClassifier;
use crate::error::{ConfigIntegrityError, InferenceError};
use crate::feature_extractor::FeatureExtractor;
use crate::models::InferenceEngine;
use crate::preprocessing::StandardScaler;
use crate::types::{CreditApplication, PredictionResult, FEATURE_COUNT};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// The loaded, immutable scoring pipeline shared by every request task.
pub struct ScoringService {
    extractor: FeatureExtractor,
    scaler: Arc<StandardScaler>,
    engine: Arc<InferenceEngine>,
    classifier: RiskClassifier,
    model_version: String,
}

impl ScoringService {
    /// Assemble the pipeline and run the startup self-check.
    pub fn new(
        scaler: Arc<StandardScaler>,
        engine: Arc<InferenceEngine>,
        classifier: RiskClassifier,
        model_version: impl Into<String>,
    ) -> Result<Self, ConfigIntegrityError> {
        let service = Self {
            extractor: FeatureExtractor::new(),
            scaler,
            engine,
            classifier,
            model_version: model_version.into(),
        };
        service.self_check()?;
        Ok(service)
    }

    /// Verify that the feature contract, the scaler and the model agree on
    /// width, then score one probe row end to end.
    fn self_check(&self) -> Result<(), ConfigIntegrityError> {
        let scaler_width = self.scaler.width();
        if scaler_width != self.extractor.feature_count() {
            return Err(ConfigIntegrityError::ScalerWidth {
                scaler_width,
                expected: self.extractor.feature_count(),
            });
        }
        if let Some(model_width) = self.engine.input_width() {
            if model_width != scaler_width {
                return Err(ConfigIntegrityError::ModelWidth {
                    model_width,
                    scaler_width,
                });
            }
        }

        // The scaler means standardize to an all-zero row.
        let probe: [f64; FEATURE_COUNT] = self
            .scaler
            .params()
            .mean
            .as_slice()
            .try_into()
            .map_err(|_| ConfigIntegrityError::ScalerWidth {
                scaler_width,
                expected: FEATURE_COUNT,
            })?;
        let matrix = self.scaler.transform(&[probe])?;
        let probability = self.engine.score(&matrix)?;

        info!(
            probe_probability = probability.first().copied().unwrap_or_default(),
            "Startup self-check passed"
        );
        Ok(())
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn model_type(&self) -> &str {
        self.engine.model_type()
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Score one application.
    pub fn predict(&self, app: &CreditApplication) -> Result<PredictionResult, InferenceError> {
        let mut results = self.predict_batch(std::slice::from_ref(app))?;
        results.pop().ok_or(InferenceError::OutputLength {
            expected: 1,
            actual: 0,
        })
    }

    /// Score a batch as one array operation. Output order matches input
    /// order; any failure fails the whole batch.
    pub fn predict_batch(
        &self,
        apps: &[CreditApplication],
    ) -> Result<Vec<PredictionResult>, InferenceError> {
        let features = self.extractor.extract_batch(apps);
        let scaled = self.scaler.transform(&features)?;
        let probabilities = self.engine.score(&scaled)?;

        if probabilities.len() != apps.len() {
            return Err(InferenceError::OutputLength {
                expected: apps.len(),
                actual: probabilities.len(),
            });
        }

        let timestamp = Utc::now();
        let results: Vec<PredictionResult> = probabilities
            .into_iter()
            .map(|probability| {
                let (prediction, risk_level) = self.classifier.classify(probability);
                PredictionResult {
                    prediction,
                    probability,
                    risk_level,
                    timestamp,
                    model_version: self.model_version.clone(),
                }
            })
            .collect();

        debug!(batch_size = results.len(), "Batch classified");
        Ok(results)
    }

    /// Run [`ScoringService::predict_batch`] on the blocking pool so a
    /// serialized model session never stalls the async workers.
    pub async fn predict_batch_blocking(
        self: Arc<Self>,
        apps: Vec<CreditApplication>,
    ) -> Result<Vec<PredictionResult>, InferenceError> {
        tokio::task::spawn_blocking(move || self.predict_batch(&apps))
            .await
            .map_err(|e| InferenceError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scorer;
    use crate::preprocessing::{FeatureMatrix, ScalingParameters};
    use crate::types::application::tests::safe_payload;
    use crate::types::{Decision, RiskLevel};

    struct ConstantScorer {
        probability: f32,
        width: Option<usize>,
    }

    impl Scorer for ConstantScorer {
        fn score(&self, batch: &FeatureMatrix) -> Result<Vec<f32>, InferenceError> {
            Ok(vec![self.probability; batch.rows()])
        }

        fn input_width(&self) -> Option<usize> {
            self.width
        }

        fn model_type(&self) -> &str {
            "constant"
        }
    }

    fn scaler(width: usize) -> Arc<StandardScaler> {
        Arc::new(
            StandardScaler::new(ScalingParameters {
                mean: vec![0.0; width],
                scale: vec![1.0; width],
                feature_names: None,
            })
            .unwrap(),
        )
    }

    fn engine(probability: f32, width: Option<usize>) -> Arc<InferenceEngine> {
        Arc::new(InferenceEngine::new(ConstantScorer { probability, width }))
    }

    fn app() -> CreditApplication {
        CreditApplication::validate(&safe_payload()).unwrap()
    }

    #[test]
    fn test_predict_classifies_probability() {
        let service = ScoringService::new(
            scaler(10),
            engine(0.75, Some(10)),
            RiskClassifier::default(),
            "2.1.0",
        )
        .unwrap();

        let result = service.predict(&app()).unwrap();

        assert_eq!(result.prediction, Decision::Deny);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.model_version, "2.1.0");
        assert!((result.probability - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_batch_length_matches_input() {
        let service =
            ScoringService::new(scaler(10), engine(0.1, None), RiskClassifier::default(), "1")
                .unwrap();

        let results = service.predict_batch(&[app(), app(), app()]).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.prediction == Decision::Approve));
    }

    #[test]
    fn test_self_check_rejects_scaler_width() {
        let err =
            ScoringService::new(scaler(9), engine(0.1, None), RiskClassifier::default(), "1")
                .err()
                .unwrap();
        assert!(matches!(
            err,
            ConfigIntegrityError::ScalerWidth {
                scaler_width: 9,
                expected: 10
            }
        ));
    }

    #[test]
    fn test_self_check_rejects_model_width() {
        let err = ScoringService::new(
            scaler(10),
            engine(0.1, Some(12)),
            RiskClassifier::default(),
            "1",
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigIntegrityError::ModelWidth {
                model_width: 12,
                scaler_width: 10
            }
        ));
    }

    #[test]
    fn test_self_check_surfaces_scoring_failure() {
        let err = ScoringService::new(
            scaler(10),
            engine(f32::NAN, None),
            RiskClassifier::default(),
            "1",
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigIntegrityError::SelfCheck(InferenceError::NonFinite { row: 0 })
        ));
    }

    #[tokio::test]
    async fn test_blocking_offload() {
        let service = Arc::new(
            ScoringService::new(scaler(10), engine(0.4, None), RiskClassifier::default(), "1")
                .unwrap(),
        );

        let results = service.predict_batch_blocking(vec![app(), app()]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].risk_level, RiskLevel::Medium);
    }
}
