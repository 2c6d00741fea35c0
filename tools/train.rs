//! Training job
//!
//! Reads a StormEvents details CSV, fits the transformer and forest, reports
//! held-out metrics and writes the artifact the server loads.
//!
//! Usage: train [DATA_DIR_OR_CSV]

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

use storm_damage::{config::AppConfig, logging, TrainingPipeline};

fn main() -> Result<()> {
    let mut config = AppConfig::load()?;
    logging::init(&config.logging)?;

    if let Some(arg) = std::env::args().nth(1) {
        let path = PathBuf::from(arg);
        if path.is_dir() {
            config.training.data_dir = path;
            config.training.dataset_path = None;
        } else {
            config.training.dataset_path = Some(path);
        }
    }

    info!(
        data_dir = %config.training.data_dir.display(),
        dataset = ?config.training.dataset_path,
        n_estimators = config.training.forest.n_estimators,
        test_fraction = config.training.test_fraction,
        seed = config.training.seed,
        "Starting training job"
    );

    let pipeline = TrainingPipeline::new(config.training.clone());
    let report = match pipeline.run(&config.artifact.path) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Training failed");
            return Err(e).context("training job failed");
        }
    };

    info!(
        dataset = %report.dataset_path.display(),
        artifact = %report.artifact_path.display(),
        artifact_id = %report.metadata.artifact_id,
        train_rows = report.metadata.train_rows,
        eval_rows = report.metadata.eval_rows,
        dropped_rows = report.metadata.dropped_rows,
        "Artifact written"
    );
    for m in &report.metadata.evaluation {
        info!(
            target = %m.target,
            rmse = format!("{:.2}", m.rmse),
            mae = format!("{:.2}", m.mae),
            r2 = format!("{:.4}", m.r2),
            "Held-out metrics"
        );
    }

    Ok(())
}
