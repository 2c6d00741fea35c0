//! Error types for the damage estimation pipeline.
//!
//! Damage-string parse failures are not errors here: they are the
//! `ParsedDamage::Invalid` outcome in `features::damage`. Missing features and
//! unseen categories are absorbed by the fitted transformer and never surface.

use std::path::PathBuf;

/// Failures loading or persisting a fitted artifact. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found at {path}; run the `train` binary first")]
    NotFound { path: PathBuf },

    #[error("i/o error on artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a storm damage artifact (bad magic header)")]
    BadMagic { path: PathBuf },

    #[error("artifact {path} is corrupt: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("artifact format mismatch: expected v{expected}, found v{found}; retrain the model")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("failed to encode artifact: {0}")]
    Encode(#[source] bincode::Error),

    #[error("artifact {path} is inconsistent: {reason}; retrain the model")]
    Inconsistent { path: PathBuf, reason: String },
}

/// Failures on the per-request prediction path.
///
/// Every variant is recovered at the serving boundary into a fallback
/// `PredictionResult` carrying the rendered message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction service is not ready: no model artifact loaded")]
    NotReady,

    #[error("invalid request field `{field}`: {reason}")]
    InvalidRequest { field: String, reason: String },

    #[error("feature vector has {found} columns, model expects {expected}")]
    FeatureWidth { expected: usize, found: usize },

    #[error("model failure: {0}")]
    Model(String),
}

impl PredictionError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::FeatureWidth { .. } => "feature_width",
            Self::Model(_) => "model",
        }
    }
}

/// Fatal failures of the offline training job.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("no dataset matching {pattern} found in {dir}; put a StormEvents details CSV there first")]
    DatasetNotFound { dir: PathBuf, pattern: String },

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),

    #[error("need at least {required} usable rows to train, found {found}")]
    NotEnoughRows { required: usize, found: usize },

    #[error("model fit failed: {0}")]
    Model(String),

    #[error("held-out evaluation failed: {0}")]
    Evaluation(#[from] PredictionError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_messages_are_non_empty() {
        let errors = [
            PredictionError::NotReady,
            PredictionError::invalid("month", "expected an integer"),
            PredictionError::FeatureWidth {
                expected: 10,
                found: 3,
            },
            PredictionError::Model("non-finite output".to_string()),
        ];

        for err in &errors {
            assert!(!err.to_string().is_empty());
        }
        assert_eq!(errors[1].kind(), "invalid_request");
        assert!(errors[1].to_string().contains("month"));
    }
}
