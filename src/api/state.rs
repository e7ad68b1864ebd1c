//! Shared application state and the load-once lifecycle.

use crate::classifier::RiskClassifier;
use crate::config::AppConfig;
use crate::error::{ServiceError, StartupError};
use crate::metrics::ServiceMetrics;
use crate::models::InferenceEngine;
use crate::preprocessing::StandardScaler;
use crate::service::ScoringService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Cloneable handle passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    metrics: Arc<ServiceMetrics>,
    scaler_loaded: AtomicBool,
    model_loaded: AtomicBool,
    service: OnceLock<Arc<ScoringService>>,
}

impl AppState {
    /// State with nothing loaded yet. Prediction routes answer 503 until
    /// [`AppState::load`] or [`AppState::install`] succeeds.
    pub fn new(config: AppConfig, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                metrics,
                scaler_loaded: AtomicBool::new(false),
                model_loaded: AtomicBool::new(false),
                service: OnceLock::new(),
            }),
        }
    }

    /// Load the scaler, then the model, from the configured paths and run the
    /// startup self-check.
    pub fn load(&self) -> Result<(), StartupError> {
        let model_config = &self.inner.config.model;

        let scaler = StandardScaler::from_file(&model_config.scaler_path).map_err(|e| {
            error!(path = %model_config.scaler_path.display(), error = %e, "Failed to load scaler");
            StartupError::Scaler(e)
        })?;
        self.inner.scaler_loaded.store(true, Ordering::SeqCst);

        let engine = InferenceEngine::load(&model_config.path, model_config.onnx_threads)
            .map_err(|e| {
                error!(path = %model_config.path.display(), error = %e, "Failed to load model");
                StartupError::Model(e)
            })?;
        self.inner.model_loaded.store(true, Ordering::SeqCst);

        self.install(scaler, engine)
    }

    /// Assemble the pipeline from already loaded components.
    pub fn install(
        &self,
        scaler: StandardScaler,
        engine: InferenceEngine,
    ) -> Result<(), StartupError> {
        self.inner.scaler_loaded.store(true, Ordering::SeqCst);
        self.inner.model_loaded.store(true, Ordering::SeqCst);

        let config = &self.inner.config;
        let service = ScoringService::new(
            Arc::new(scaler),
            Arc::new(engine),
            RiskClassifier::new(config.classification),
            config.model.version.clone(),
        )
        .map_err(|e| {
            error!(error = %e, "Startup self-check failed");
            StartupError::from(e)
        })?;

        let thresholds = service.classifier().thresholds();
        info!(
            model_type = service.model_type(),
            model_version = service.model_version(),
            decision_threshold = thresholds.decision_threshold,
            medium = thresholds.medium,
            high = thresholds.high,
            "Scoring pipeline ready"
        );

        if self.inner.service.set(Arc::new(service)).is_err() {
            warn!("Scoring pipeline already installed, keeping the first one");
        }
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn scaler_loaded(&self) -> bool {
        self.inner.scaler_loaded.load(Ordering::SeqCst)
    }

    pub fn model_loaded(&self) -> bool {
        self.inner.model_loaded.load(Ordering::SeqCst)
    }

    /// True once the pipeline passed its self-check.
    pub fn is_ready(&self) -> bool {
        self.inner.service.get().is_some()
    }

    /// The scoring pipeline, or the component that is still missing.
    pub fn service(&self) -> Result<Arc<ScoringService>, ServiceError> {
        if let Some(service) = self.inner.service.get() {
            return Ok(service.clone());
        }
        if !self.scaler_loaded() {
            Err(ServiceError::NotReady("scaler"))
        } else {
            Err(ServiceError::NotReady("model"))
        }
    }
}
