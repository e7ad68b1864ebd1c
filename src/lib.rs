//! Credit Scoring Service Library
//!
//! Real-time credit risk scoring over HTTP: validate an application, derive
//! its standardized feature vector, score it with a pre-trained model and
//! map the default probability to a decision and a risk band.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod service;
pub mod types;

pub use api::{router, AppState};
pub use classifier::{RiskClassifier, RiskThresholds};
pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use metrics::ServiceMetrics;
pub use models::inference::InferenceEngine;
pub use preprocessing::StandardScaler;
pub use service::ScoringService;
pub use types::{CreditApplication, PredictionResult};
