//! Feature extraction for credit scoring model inference.
//!
//! Converts validated applications into the fixed-order feature vectors
//! the scaler and the model were fitted on.

use crate::types::application::{CreditApplication, FEATURE_COUNT};

/// Raw, unscaled model input for one application.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Feature extractor that transforms applications into model input features.
///
/// Features are extracted in the exact order expected by the scaler and
/// the ONNX model (see [`crate::types::FEATURE_NAMES`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from an application.
    pub fn extract(&self, app: &CreditApplication) -> FeatureVector {
        [
            app.age() as f64,
            app.income(),
            app.loan_amount(),
            app.credit_history_length() as f64,
            app.num_open_accounts() as f64,
            app.debt_to_income(),
            app.num_late_payments() as f64,
            app.employment_length() as f64,
            app.num_credit_inquiries() as f64,
            app.credit_utilization(),
        ]
    }

    /// Extract features for a batch, preserving order.
    pub fn extract_batch(&self, apps: &[CreditApplication]) -> Vec<FeatureVector> {
        apps.iter().map(|app| self.extract(app)).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }
}
