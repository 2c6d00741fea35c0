//! Inference over a loaded artifact: transform, then predict.

use std::sync::Arc;
use tracing::debug;

use crate::error::PredictionError;
use crate::models::artifact::FittedArtifact;
use crate::models::DamageModel;
use crate::types::event::EventRecord;

/// Raw model output before any post-processing. Components may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDamage {
    pub property: f64,
    /// `None` when the model was trained without a crop target.
    pub crop: Option<f64>,
}

/// Transform then predict against a borrowed artifact. Training evaluation
/// and serving both go through here.
pub fn infer(artifact: &FittedArtifact, record: &EventRecord) -> Result<RawDamage, PredictionError> {
    let features = artifact.transformer.transform_one(record);
    let outputs = artifact.model.predict(&features)?;

    if let Some(bad) = outputs.iter().find(|v| !v.is_finite()) {
        return Err(PredictionError::Model(format!("non-finite model output {bad}")));
    }

    let raw = match outputs.as_slice() {
        [property] => RawDamage {
            property: *property,
            crop: None,
        },
        [property, crop, ..] => RawDamage {
            property: *property,
            crop: Some(*crop),
        },
        [] => return Err(PredictionError::Model("model produced no outputs".to_string())),
    };

    debug!(
        features = features.len(),
        property = raw.property,
        crop = ?raw.crop,
        "Inference complete"
    );

    Ok(raw)
}

/// Read-only inference handle shared by every request.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    artifact: Arc<FittedArtifact>,
}

impl InferenceEngine {
    pub fn new(artifact: Arc<FittedArtifact>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &FittedArtifact {
        &self.artifact
    }

    /// Number of transformed features fed to the model
    pub fn feature_count(&self) -> usize {
        self.artifact.transformer.feature_count()
    }

    /// Run the fitted transformer and model on a single record.
    pub fn predict(&self, record: &EventRecord) -> Result<RawDamage, PredictionError> {
        infer(&self.artifact, record)
    }
}
