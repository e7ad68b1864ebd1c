//! Prediction response data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier derived from the default probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit decision. Serialized as `0` (approve) or `1` (deny).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn as_u8(&self) -> u8 {
        match self {
            Decision::Approve => 0,
            Decision::Deny => 1,
        }
    }

    /// Metric label for this decision class
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approve => "0",
            Decision::Deny => "1",
        }
    }
}

impl Serialize for Decision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Decision::Approve),
            1 => Ok(Decision::Deny),
            other => Err(serde::de::Error::custom(format!(
                "prediction must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// Scoring outcome for one credit application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0 = approved, 1 = denied
    pub prediction: Decision,

    /// Default probability (0.0 - 1.0)
    pub probability: f64,

    /// Risk tier
    pub risk_level: RiskLevel,

    /// Prediction timestamp
    pub timestamp: DateTime<Utc>,

    /// Version of the model artifact that produced the score
    pub model_version: String,
}

/// Batch scoring response, in request order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictionResult {
    pub predictions: Vec<PredictionResult>,
    pub batch_size: usize,
}

impl BatchPredictionResult {
    pub fn new(predictions: Vec<PredictionResult>) -> Self {
        let batch_size = predictions.len();
        Self {
            predictions,
            batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_serialization() {
        let result = PredictionResult {
            prediction: Decision::Deny,
            probability: 0.82,
            risk_level: RiskLevel::High,
            timestamp: Utc::now(),
            model_version: "1.0.0".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["prediction"], 1);
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["model_version"], "1.0.0");

        let deserialized: PredictionResult = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, result);
    }

    #[test]
    fn test_decision_rejects_other_values() {
        assert!(serde_json::from_str::<Decision>("2").is_err());
    }
}
