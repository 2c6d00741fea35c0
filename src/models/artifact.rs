//! The persisted transformer + model bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::transformer::FittedTransformer;
use crate::models::forest::RegressionForest;
use crate::models::DamageModel;
use crate::training::evaluation::TargetMetrics;
use crate::types::event::EventRecord;

/// Bumped whenever the encoded layout of `FittedArtifact` changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Leading bytes of every artifact file.
pub const ARTIFACT_MAGIC: &[u8; 8] = b"STRMDMG\0";

/// Provenance recorded at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub artifact_id: String,
    pub created_at: DateTime<Utc>,
    /// Target names in model output order, e.g. `["property_damage", "crop_damage"]`.
    pub targets: Vec<String>,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub eval_rows: usize,
    /// Rows discarded because a damage label was unparseable.
    pub dropped_rows: usize,
    pub evaluation: Vec<TargetMetrics>,
}

/// Immutable fitted pipeline. Built once by training, shared read-only by serving.
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedArtifact {
    pub metadata: ArtifactMetadata,
    pub transformer: FittedTransformer,
    pub model: RegressionForest,
}

impl FittedArtifact {
    pub fn new(
        metadata: ArtifactMetadata,
        transformer: FittedTransformer,
        model: RegressionForest,
    ) -> Self {
        Self {
            metadata,
            transformer,
            model,
        }
    }

    pub fn artifact_id(&self) -> &str {
        &self.metadata.artifact_id
    }

    /// Check that the parts of the bundle fit together: transformer width
    /// matches the model input, targets match the model outputs, and a
    /// fully imputed record predicts finite values.
    pub fn check_consistency(&self) -> Result<(), String> {
        let width = self.transformer.feature_count();
        if width != self.model.n_features() {
            return Err(format!(
                "transformer produces {width} features, model expects {}",
                self.model.n_features()
            ));
        }
        if self.metadata.feature_names.len() != width {
            return Err(format!(
                "{} feature names recorded for {width} features",
                self.metadata.feature_names.len()
            ));
        }
        let outputs = self.model.n_outputs();
        if !(1..=2).contains(&outputs) || self.metadata.targets.len() != outputs {
            return Err(format!(
                "model has {outputs} outputs for targets {:?}",
                self.metadata.targets
            ));
        }

        let features = self.transformer.transform_one(&EventRecord::default());
        let predicted = self.model.predict(&features).map_err(|e| e.to_string())?;
        if predicted.iter().any(|v| !v.is_finite()) {
            return Err(format!("non-finite prediction {predicted:?} for an imputed record"));
        }
        Ok(())
    }
}
