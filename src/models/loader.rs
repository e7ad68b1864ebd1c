//! Model artifact loader

use crate::error::LoadError;
use crate::models::inference::Scorer;
use crate::models::linear::LogisticModel;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::{info, warn};

static ORT_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Loaded ONNX model with metadata
pub struct OnnxModel {
    /// Model name (artifact file stem)
    pub name: String,
    /// ONNX Runtime session. `Session::run` needs `&mut self`, so concurrent
    /// scoring calls are serialized here.
    pub(crate) session: Mutex<Session>,
    /// Input name for the model
    pub(crate) input_name: String,
    /// Output name for probabilities
    pub(crate) output_name: String,
    /// Declared feature width, `None` when the last axis is dynamic
    pub(crate) input_width: Option<usize>,
}

/// Loader for scoring artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a scoring artifact, picking the backend from the file extension.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn Scorer>, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => Ok(Box::new(self.load_onnx(path)?)),
            Some("json") => Ok(Box::new(LogisticModel::from_file(path)?)),
            other => Err(LoadError::incompatible(
                path,
                format!("unsupported artifact format {:?}", other.unwrap_or("")),
            )),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_onnx(&self, path: &Path) -> Result<OnnxModel, LoadError> {
        init_runtime()?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx-model")
            .to_string();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let malformed = |e: ort::Error| LoadError::malformed(path, e);
        let session = Session::builder()
            .map_err(malformed)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(malformed)?
            .with_intra_threads(self.onnx_threads)
            .map_err(malformed)?
            .commit_from_file(path)
            .map_err(malformed)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| LoadError::incompatible(path, "model declares no inputs"))?;
        let input_name = input.name.clone();
        let input_width = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape
                .iter()
                .last()
                .copied()
                .filter(|dim| *dim > 0)
                .map(|dim| dim as usize),
            other => {
                return Err(LoadError::incompatible(
                    path,
                    format!("model input is not a tensor: {:?}", other),
                ))
            }
        };

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| LoadError::incompatible(path, "model declares no outputs"))?;

        if input_width.is_none() {
            warn!(model = %name, "Model input width is dynamic, relying on startup self-check");
        }

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            input_width = ?input_width,
            "Model loaded successfully"
        );

        Ok(OnnxModel {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
            input_width,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize the ONNX Runtime environment once per process.
fn init_runtime() -> Result<(), LoadError> {
    ORT_INIT
        .get_or_init(|| {
            ort::init()
                .with_name("credit-scoring")
                .commit()
                .map(|_| info!("ONNX Runtime initialized"))
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(LoadError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_missing_artifact() {
        let err = ModelLoader::new().load("models/missing.onnx").err().unwrap();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ModelLoader::new().load(fixture("model.pkl")).err().unwrap();
        assert!(matches!(err, LoadError::Incompatible { .. }));
    }

    #[test]
    fn test_loads_logistic_artifact() {
        let scorer = ModelLoader::new().load(fixture("model.json")).unwrap();
        assert_eq!(scorer.input_width(), Some(10));
        assert_eq!(scorer.model_type(), "Logistic Regression");
    }

    #[test]
    fn test_malformed_logistic_artifact() {
        let err = ModelLoader::new()
            .load(fixture("malformed_model.json"))
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }
}
