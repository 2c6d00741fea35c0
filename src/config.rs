//! Configuration management for the damage estimation service and training job

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::forest::ForestParams;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    pub artifact: ArtifactConfig,
    pub training: TrainingConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Optional NATS request/reply transport
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub enabled: bool,
    /// NATS server URL
    pub url: String,
    /// Subject prediction requests arrive on
    pub request_subject: String,
    /// Where results go when a request carries no reply subject
    pub result_subject: String,
    /// Queue group shared by server instances; unset means every instance
    /// sees every request
    pub queue_group: Option<String>,
}

impl NatsConfig {
    /// Configured queue group, with a blank value treated as unset.
    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "nats://localhost:4222".to_string(),
            request_subject: "storm.damage.requests".to_string(),
            result_subject: "storm.damage.predictions".to_string(),
            queue_group: Some("storm-damage-workers".to_string()),
        }
    }
}

/// Fitted artifact location, shared by the trainer (writer) and server (reader)
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    pub path: PathBuf,
}

/// Training job configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Directory searched for `StormEvents_details-*.csv`
    pub data_dir: PathBuf,
    /// Explicit dataset file; skips the directory search when set
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the split and the forest
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub forest: ForestConfig,
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl TrainingConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.forest.n_estimators,
            max_depth: self.forest.max_depth,
            min_samples_split: self.forest.min_samples_split,
            min_samples_leaf: self.forest.min_samples_leaf,
            max_features_fraction: self.forest.max_features_fraction,
            seed: self.seed,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            dataset_path: None,
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            forest: ForestConfig::default(),
        }
    }
}

/// Regression forest hyperparameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features_fraction: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        let params = ForestParams::default();
        Self {
            n_estimators: params.n_estimators,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features_fraction: params.max_features_fraction,
        }
    }
}

/// Request handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum NATS requests processed concurrently
    pub workers: usize,
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `config/config.toml` plus `STORM__*` overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("STORM").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            nats: NatsConfig::default(),
            artifact: ArtifactConfig {
                path: PathBuf::from("models/storm_damage_model.bin"),
            },
            training: TrainingConfig::default(),
            pipeline: PipelineConfig { workers: 4 },
            metrics: MetricsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
