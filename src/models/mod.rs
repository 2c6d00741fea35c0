//! Damage model, fitted artifact and inference components

pub mod artifact;
pub mod forest;
pub mod inference;
pub mod loader;

pub use artifact::{ArtifactMetadata, FittedArtifact};
pub use forest::{ForestParams, RegressionForest};
pub use inference::{InferenceEngine, RawDamage};
pub use loader::{load_artifact, save_artifact};

use crate::error::PredictionError;

/// A fitted regressor over transformed feature vectors.
///
/// Outputs are raw: nothing guarantees they are non-negative, so callers clamp.
pub trait DamageModel: Send + Sync {
    /// Expected feature vector width.
    fn n_features(&self) -> usize;

    /// 1 (property only) or 2 (property, crop).
    fn n_outputs(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError>;
}
