//! Offline training: dataset ingest, labels, split, fit, evaluation.

pub mod dataset;
pub mod evaluation;
pub mod pipeline;
pub mod split;

pub use evaluation::TargetMetrics;
pub use pipeline::{DamageLabel, TrainingPipeline, TrainingReport};
