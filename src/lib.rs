//! Storm Damage Estimator
//!
//! Trains a multi-output random forest on NOAA storm event records and serves
//! property and crop damage estimates over HTTP and, optionally, NATS.

pub mod config;
pub mod consumer;
pub mod error;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod server;
pub mod service;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use consumer::PredictionConsumer;
pub use error::{ArtifactError, PredictionError, TrainingError};
pub use models::inference::InferenceEngine;
pub use producer::ResultPublisher;
pub use server::create_router;
pub use service::PredictionService;
pub use training::TrainingPipeline;
pub use types::{DamageEstimate, DamageSeverity, EventRecord, PredictionRequest, PredictionResult};
