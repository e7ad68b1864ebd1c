//! Configuration management for the scoring service

use crate::classifier::RiskThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "CREDIT_SCORING_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const ENV_PREFIX: &str = "CREDIT_SCORING";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub classification: RiskThresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout in milliseconds (0 disables it)
    pub request_timeout_ms: u64,
    /// Largest accepted `/predict/batch` payload
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_ms: 0,
            max_batch_size: 1000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Scoring artifact (`.onnx` or logistic `.json`)
    pub path: PathBuf,
    /// Scaling parameters exported from the fitted standardizer
    pub scaler_path: PathBuf,
    /// Version reported with every prediction
    pub version: String,
    /// Optimization applied to the artifact, reported by `/model/info`
    pub optimization: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/credit_scoring_quantized.onnx"),
            scaler_path: PathBuf::from("models/scaler.json"),
            version: "1.0.0".to_string(),
            optimization: "INT8 Quantization".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries (0 disables them)
    pub summary_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            summary_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, or the one named by
    /// `CREDIT_SCORING_CONFIG`, layered under environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path. A missing file falls back to
    /// the built-in defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        self.classification
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid classification thresholds: {}", e))?;
        if self.server.max_batch_size == 0 {
            anyhow::bail!("server.max_batch_size must be at least 1");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!(
                "logging.format must be `json` or `pretty`, got `{}`",
                self.logging.format
            );
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            classification: RiskThresholds::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.version, "1.0.0");
        assert_eq!(config.classification.decision_threshold, 0.5);
        assert_eq!(config.classification.medium, 0.3);
        assert_eq!(config.classification.high, 0.7);
        assert!(config.server.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();
        assert_eq!(config.model.optimization, "INT8 Quantization");
        assert_eq!(config.server.max_batch_size, 1000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_path("config/does-not-exist.toml").unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut config = AppConfig::default();
        config.classification.medium = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
