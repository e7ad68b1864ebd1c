//! Feature standardization with a previously fitted scaler.

use crate::error::{InferenceError, LoadError};
use crate::types::application::FEATURE_NAMES;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Per-feature `(mean, scale)` pairs exported from the fitted standardizer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScalingParameters {
    #[serde(alias = "mean_")]
    pub mean: Vec<f64>,
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
    #[serde(default, alias = "feature_names_in_")]
    pub feature_names: Option<Vec<String>>,
}

/// Row-major `f32` matrix in the layout the model consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    width: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(rows: usize, width: usize, data: Vec<f32>) -> Result<Self, InferenceError> {
        if data.len() != rows * width {
            return Err(InferenceError::ShapeMismatch {
                expected: rows * width,
                actual: data.len(),
            });
        }
        Ok(Self { rows, width, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Tensor shape `[rows, width]`.
    pub fn shape(&self) -> Vec<i64> {
        vec![self.rows as i64, self.width as i64]
    }
}

/// Applies `(x - mean) / scale` column by column.
///
/// Immutable after construction and safe to share across request tasks.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    params: ScalingParameters,
}

impl StandardScaler {
    /// Build a scaler, rejecting parameters that cannot standardize.
    pub fn new(params: ScalingParameters) -> Result<Self, String> {
        if params.mean.len() != params.scale.len() {
            return Err(format!(
                "{} means but {} scales",
                params.mean.len(),
                params.scale.len()
            ));
        }
        if params.mean.is_empty() {
            return Err("no scaling parameters".to_string());
        }
        if let Some(i) = params.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean for feature {} is not finite", i));
        }
        if let Some(i) = params
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(format!(
                "scale for feature {} must be positive, got {}",
                i, params.scale[i]
            ));
        }
        Ok(Self { params })
    }

    /// Load scaling parameters from a JSON export.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading scaler");

        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::malformed(path, e))?;
        let params: ScalingParameters =
            serde_json::from_str(&raw).map_err(|e| LoadError::malformed(path, e))?;

        if let Some(names) = &params.feature_names {
            if names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
                return Err(LoadError::incompatible(
                    path,
                    format!("feature order {:?} does not match {:?}", names, FEATURE_NAMES),
                ));
            }
        }

        let scaler = Self::new(params).map_err(|reason| LoadError::malformed(path, reason))?;
        info!(features = scaler.width(), "Scaler loaded successfully");
        Ok(scaler)
    }

    /// Number of features the scaler was fitted on.
    pub fn width(&self) -> usize {
        self.params.mean.len()
    }

    pub fn params(&self) -> &ScalingParameters {
        &self.params
    }

    /// Standardize a batch of raw feature rows.
    pub fn transform<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<FeatureMatrix, InferenceError> {
        let width = self.width();
        let mut data = Vec::with_capacity(rows.len() * width);

        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(InferenceError::ShapeMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend(
                row.iter()
                    .zip(&self.params.mean)
                    .zip(&self.params.scale)
                    .map(|((x, mean), scale)| to_model_input((x - mean) / scale)),
            );
        }

        FeatureMatrix::new(rows.len(), width, data)
    }
}

/// Narrow a standardized value to `f32`. Unbounded fields such as income can
/// standardize past `f32::MAX`; those saturate instead of becoming infinite.
fn to_model_input(z: f64) -> f32 {
    z.clamp(f64::from(f32::MIN), f64::from(f32::MAX)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_COUNT;

    fn params(mean: Vec<f64>, scale: Vec<f64>) -> ScalingParameters {
        ScalingParameters {
            mean,
            scale,
            feature_names: None,
        }
    }

    #[test]
    fn test_transform_standardizes_columns() {
        let scaler = StandardScaler::new(params(vec![10.0, 0.5], vec![2.0, 0.25])).unwrap();

        let matrix = scaler.transform(&[[14.0, 0.5], [10.0, 0.0]]).unwrap();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.as_slice(), &[2.0, 0.0, 0.0, -2.0]);
        assert_eq!(matrix.shape(), vec![2, 2]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::new(params(vec![0.0; 3], vec![1.0; 3])).unwrap();

        let err = scaler.transform(&[vec![1.0, 2.0]]).unwrap_err();
        assert_eq!(
            err,
            InferenceError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_rejects_zero_scale() {
        assert!(StandardScaler::new(params(vec![0.0, 0.0], vec![1.0, 0.0])).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(StandardScaler::new(params(vec![0.0, 0.0], vec![1.0])).is_err());
    }

    #[test]
    fn test_accepts_sklearn_attribute_names() {
        let params: ScalingParameters =
            serde_json::from_str(r#"{"mean_": [1.0], "scale_": [2.0]}"#).unwrap();
        assert_eq!(params.mean, vec![1.0]);
        assert_eq!(params.scale, vec![2.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = StandardScaler::from_file("does/not/exist.json").unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_loads_fixture_with_feature_names() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scaler.json");
        let scaler = StandardScaler::from_file(path).unwrap();
        assert_eq!(scaler.width(), FEATURE_COUNT);
        assert_eq!(scaler.params().mean[1], 55000.0);
    }

    #[test]
    fn test_rejects_reordered_feature_names() {
        let path =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scaler_wrong_names.json");
        let err = StandardScaler::from_file(path).unwrap_err();
        assert!(matches!(err, LoadError::Incompatible { .. }));
    }

    #[test]
    fn test_extreme_values_saturate() {
        let scaler = StandardScaler::new(params(vec![0.0, 0.0], vec![1.0, 1.0])).unwrap();

        let matrix = scaler.transform(&[[1e300, -1e300]]).unwrap();

        assert_eq!(matrix.as_slice(), &[f32::MAX, f32::MIN]);
        assert!(matrix.as_slice().iter().all(|v| v.is_finite()));
    }
}
