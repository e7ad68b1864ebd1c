//! Maps a default probability to a credit decision and a risk tier.

use crate::types::{Decision, RiskLevel};
use serde::Deserialize;

/// Decision and tier cut-offs. Each threshold belongs to the higher class.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Probability at or above which an application is denied
    pub decision_threshold: f64,
    /// Lower edge of the medium tier
    pub medium: f64,
    /// Lower edge of the high tier
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
            medium: 0.3,
            high: 0.7,
        }
    }
}

impl RiskThresholds {
    /// Check that every threshold is a probability and the tiers are ordered.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("decision_threshold", self.decision_threshold),
            ("medium", self.medium),
            ("high", self.high),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.medium > self.high {
            return Err(format!(
                "medium threshold {} exceeds high threshold {}",
                self.medium, self.high
            ));
        }
        Ok(())
    }
}

/// Stateless classifier over fixed thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn classify(&self, probability: f64) -> (Decision, RiskLevel) {
        (self.decision(probability), self.risk_level(probability))
    }

    pub fn decision(&self, probability: f64) -> Decision {
        if probability >= self.thresholds.decision_threshold {
            Decision::Deny
        } else {
            Decision::Approve
        }
    }

    pub fn risk_level(&self, probability: f64) -> RiskLevel {
        if probability >= self.thresholds.high {
            RiskLevel::High
        } else if probability >= self.thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_risk_level_boundaries() {
        let classifier = RiskClassifier::default();

        assert_eq!(classifier.risk_level(0.0), RiskLevel::Low);
        assert_eq!(classifier.risk_level(0.299), RiskLevel::Low);
        assert_eq!(classifier.risk_level(0.3), RiskLevel::Medium);
        assert_eq!(classifier.risk_level(0.699), RiskLevel::Medium);
        assert_eq!(classifier.risk_level(0.7), RiskLevel::High);
        assert_eq!(classifier.risk_level(1.0), RiskLevel::High);
    }

    #[test]
    fn test_decision_tie_is_denied() {
        let classifier = RiskClassifier::default();

        assert_eq!(classifier.decision(0.5), Decision::Deny);
        assert_eq!(classifier.decision(0.4999), Decision::Approve);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(RiskThresholds::default().validate().is_ok());

        let inverted = RiskThresholds {
            medium: 0.8,
            high: 0.2,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let out_of_range = RiskThresholds {
            decision_threshold: 1.5,
            ..Default::default()
        };
        assert!(out_of_range.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_classification_rules(p in 0.0f64..=1.0) {
            let (decision, level) = RiskClassifier::default().classify(p);

            prop_assert_eq!(decision == Decision::Deny, p >= 0.5);
            let expected = if p < 0.3 {
                RiskLevel::Low
            } else if p < 0.7 {
                RiskLevel::Medium
            } else {
                RiskLevel::High
            };
            prop_assert_eq!(level, expected);
        }
    }
}
