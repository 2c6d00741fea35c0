//! Type definitions for the storm damage pipeline

pub mod event;
pub mod prediction;

pub use event::{EventRecord, Season};
pub use prediction::{
    DamageEstimate, DamageSeverity, PredictionRequest, PredictionResult, SeverityThresholds,
};
