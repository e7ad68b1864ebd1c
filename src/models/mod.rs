//! Model artifact loading and inference

pub mod inference;
pub mod linear;
pub mod loader;

pub use inference::{InferenceEngine, Scorer};
pub use linear::LogisticModel;
pub use loader::{ModelLoader, OnnxModel};
