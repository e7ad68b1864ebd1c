//! Type definitions for the scoring service

pub mod application;
pub mod prediction;

pub use application::{
    BatchPayload, CreditApplication, CreditApplicationPayload, FEATURE_COUNT, FEATURE_NAMES,
};
pub use prediction::{BatchPredictionResult, Decision, PredictionResult, RiskLevel};
