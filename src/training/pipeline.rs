//! The offline training job: raw CSV in, persisted artifact out.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::error::TrainingError;
use crate::features::damage::parse_damage;
use crate::features::temporal;
use crate::features::transformer::FeatureTransformer;
use crate::models::artifact::{ArtifactMetadata, FittedArtifact};
use crate::models::forest::RegressionForest;
use crate::models::inference::infer;
use crate::models::loader::save_artifact;
use crate::training::dataset::{self, RawDataset, RawEventRow};
use crate::training::evaluation::TargetMetrics;
use crate::training::split::train_test_split;
use crate::types::event::EventRecord;

pub const PROPERTY_TARGET: &str = "property_damage";
pub const CROP_TARGET: &str = "crop_damage";

/// Minimum usable rows: one for training, one for evaluation.
const MIN_ROWS: usize = 2;

/// Parsed training target for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageLabel {
    pub property_damage: f64,
    /// Present only when the dataset has a crop damage column.
    pub crop_damage: Option<f64>,
}

impl DamageLabel {
    fn targets(&self) -> Vec<f64> {
        match self.crop_damage {
            Some(crop) => vec![self.property_damage, crop],
            None => vec![self.property_damage],
        }
    }
}

/// Records and labels that survived label parsing.
#[derive(Debug, Clone, Default)]
pub struct PreparedData {
    pub records: Vec<EventRecord>,
    pub labels: Vec<DamageLabel>,
    /// Rows dropped because a damage string was unparseable.
    pub dropped: usize,
}

/// Build the event record for a raw row, deriving month and season from
/// the begin timestamp.
pub fn event_record(row: &RawEventRow) -> EventRecord {
    let time = row
        .begin_date_time
        .as_deref()
        .map(temporal::derive)
        .unwrap_or_default();

    EventRecord {
        event_type: row.event_type.clone(),
        state: row.state.clone(),
        month: time.month,
        season: time.season,
        magnitude: row.magnitude,
        magnitude_type: row.magnitude_type.clone(),
        begin_lat: row.begin_lat,
        begin_lon: row.begin_lon,
    }
}

/// Parse labels and derive features. Rows with an invalid damage string are
/// dropped: a malformed label must not train the model towards zero damage.
pub fn prepare(dataset: &RawDataset) -> PreparedData {
    let mut prepared = PreparedData::default();

    for row in &dataset.rows {
        let Some(property_damage) = parse_damage(row.damage_property.as_deref()).value() else {
            prepared.dropped += 1;
            continue;
        };
        let crop_damage = if dataset.has_crop_column {
            match parse_damage(row.damage_crops.as_deref()).value() {
                Some(v) => Some(v),
                None => {
                    prepared.dropped += 1;
                    continue;
                }
            }
        } else {
            None
        };

        prepared.records.push(event_record(row));
        prepared.labels.push(DamageLabel {
            property_damage,
            crop_damage,
        });
    }

    if prepared.dropped > 0 {
        warn!(
            dropped = prepared.dropped,
            kept = prepared.records.len(),
            "Dropped rows with unparseable damage values"
        );
    }

    prepared
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub dataset_path: PathBuf,
    pub artifact_path: PathBuf,
    pub metadata: ArtifactMetadata,
}

pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Resolve the dataset file. Checked before any computation starts.
    pub fn resolve_dataset(&self) -> Result<PathBuf, TrainingError> {
        match &self.config.dataset_path {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(TrainingError::DatasetNotFound {
                dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                pattern: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            }),
            None => dataset::locate_dataset(&self.config.data_dir),
        }
    }

    /// Run the whole job and persist the artifact at `artifact_path`.
    pub fn run(&self, artifact_path: &Path) -> Result<TrainingReport, TrainingError> {
        let dataset_path = self.resolve_dataset()?;
        let started = Instant::now();

        let raw = dataset::read_dataset(&dataset_path)?;
        let artifact = self.fit(&raw)?;
        save_artifact(&artifact, artifact_path)?;

        info!(
            artifact_id = %artifact.artifact_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training complete"
        );

        Ok(TrainingReport {
            dataset_path,
            artifact_path: artifact_path.to_path_buf(),
            metadata: artifact.metadata,
        })
    }

    /// Fit transformer and model on the training partition and evaluate on
    /// the held-out partition. No I/O.
    pub fn fit(&self, raw: &RawDataset) -> Result<FittedArtifact, TrainingError> {
        let prepared = prepare(raw);
        let n = prepared.records.len();
        if n < MIN_ROWS {
            return Err(TrainingError::NotEnoughRows {
                required: MIN_ROWS,
                found: n,
            });
        }

        let (train_idx, eval_idx) =
            train_test_split(n, self.config.test_fraction, self.config.seed);
        info!(
            train_rows = train_idx.len(),
            eval_rows = eval_idx.len(),
            seed = self.config.seed,
            "Split dataset"
        );

        let pick_records = |idx: &[usize]| -> Vec<EventRecord> {
            idx.iter().map(|&i| prepared.records[i].clone()).collect()
        };
        let train_records = pick_records(&train_idx);
        let eval_records = pick_records(&eval_idx);

        let transformer = FeatureTransformer::new().fit(&train_records);
        let x_train = transformer.transform(&train_records);
        let y_train: Vec<Vec<f64>> = train_idx
            .iter()
            .map(|&i| prepared.labels[i].targets())
            .collect();

        let model = RegressionForest::fit(&x_train, &y_train, &self.config.forest_params())?;

        let mut targets = vec![PROPERTY_TARGET.to_string()];
        if raw.has_crop_column {
            targets.push(CROP_TARGET.to_string());
        }

        let metadata = ArtifactMetadata {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            targets,
            feature_names: transformer.feature_names(),
            train_rows: train_idx.len(),
            eval_rows: eval_idx.len(),
            dropped_rows: prepared.dropped,
            evaluation: Vec::new(),
        };
        let mut artifact = FittedArtifact::new(metadata, transformer, model);

        // Evaluate through the same inference path the service uses.
        let predictions = eval_records
            .iter()
            .map(|record| infer(&artifact, record))
            .collect::<Result<Vec<_>, _>>()?;

        let actual_property: Vec<f64> = eval_idx
            .iter()
            .map(|&i| prepared.labels[i].property_damage)
            .collect();
        let predicted_property: Vec<f64> = predictions.iter().map(|p| p.property).collect();
        let mut evaluation = vec![TargetMetrics::compute(
            PROPERTY_TARGET,
            &actual_property,
            &predicted_property,
        )];

        if raw.has_crop_column {
            let actual_crop: Vec<f64> = eval_idx
                .iter()
                .map(|&i| prepared.labels[i].crop_damage.unwrap_or(0.0))
                .collect();
            let predicted_crop: Vec<f64> =
                predictions.iter().map(|p| p.crop.unwrap_or(0.0)).collect();
            evaluation.push(TargetMetrics::compute(CROP_TARGET, &actual_crop, &predicted_crop));
        }

        for m in &evaluation {
            info!(
                target = %m.target,
                rows = m.rows,
                rmse = m.rmse,
                mae = m.mae,
                r2 = m.r2,
                "Held-out evaluation"
            );
        }

        artifact.metadata.evaluation = evaluation;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::Season;

    fn row(event_type: &str, when: &str, property: &str, crops: Option<&str>) -> RawEventRow {
        RawEventRow {
            event_type: Some(event_type.to_string()),
            state: Some("TEXAS".to_string()),
            begin_date_time: Some(when.to_string()),
            damage_property: Some(property.to_string()),
            damage_crops: crops.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_record_derives_calendar_features() {
        let record = event_record(&row("Hail", "24-DEC-22 10:00:00", "1K", None));
        assert_eq!(record.month, Some(12));
        assert_eq!(record.season, Some(Season::Djf));

        let undated = event_record(&row("Hail", "whenever", "1K", None));
        assert_eq!(undated.month, None);
        assert_eq!(undated.season, None);
    }

    #[test]
    fn test_prepare_drops_invalid_labels() {
        let dataset = RawDataset {
            rows: vec![
                row("Hail", "01-JUN-23 00:00:00", "10.00K", None),
                row("Hail", "01-JUN-23 00:00:00", "garbage", None),
                row("Flood", "01-APR-23 00:00:00", "0.00K", None),
            ],
            has_crop_column: false,
            row_errors: Vec::new(),
        };

        let prepared = prepare(&dataset);
        assert_eq!(prepared.dropped, 1);
        assert_eq!(prepared.records.len(), 2);
        assert_eq!(prepared.labels[0].property_damage, 10_000.0);
        assert_eq!(prepared.labels[1].property_damage, 0.0);
        assert_eq!(prepared.labels[1].crop_damage, None);
    }

    #[test]
    fn test_prepare_with_crop_column() {
        let dataset = RawDataset {
            rows: vec![
                row("Hail", "01-JUN-23 00:00:00", "1K", Some("2K")),
                row("Hail", "01-JUN-23 00:00:00", "1K", None),
                row("Hail", "01-JUN-23 00:00:00", "1K", Some("??")),
            ],
            has_crop_column: true,
            row_errors: Vec::new(),
        };

        let prepared = prepare(&dataset);
        assert_eq!(prepared.dropped, 1);
        assert_eq!(prepared.labels[0].crop_damage, Some(2_000.0));
        assert_eq!(prepared.labels[1].crop_damage, Some(0.0));
    }

    #[test]
    fn test_transformer_sees_only_training_rows() {
        let config = TrainingConfig {
            forest: crate::config::ForestConfig {
                n_estimators: 5,
                ..Default::default()
            },
            ..TrainingConfig::default()
        };
        let n = 10;
        let (train_idx, eval_idx) = train_test_split(n, config.test_fraction, config.seed);

        // Held-out rows carry a category and a magnitude no training row has.
        let rows = (0..n)
            .map(|i| {
                let held_out = eval_idx.contains(&i);
                RawEventRow {
                    magnitude: Some(if held_out { 1.0e6 } else { 1.0 + i as f64 * 0.25 }),
                    ..row(
                        if held_out { "Volcanic Ash" } else { "Hail" },
                        "01-JUN-23 00:00:00",
                        &format!("{}K", i + 1),
                        None,
                    )
                }
            })
            .collect();
        let dataset = RawDataset {
            rows,
            has_crop_column: false,
            row_errors: Vec::new(),
        };

        let artifact = TrainingPipeline::new(config).fit(&dataset).unwrap();
        let names = artifact.transformer.feature_names();
        assert!(names.contains(&"event_type=HAIL".to_string()));
        assert!(!names.iter().any(|name| name.contains("VOLCANIC ASH")));

        let mut train_magnitudes: Vec<f64> =
            train_idx.iter().map(|&i| 1.0 + i as f64 * 0.25).collect();
        train_magnitudes.sort_by(f64::total_cmp);
        let mid = train_magnitudes.len() / 2;
        let expected = (train_magnitudes[mid - 1] + train_magnitudes[mid]) / 2.0;
        assert_eq!(artifact.transformer.medians()[1], expected);

        assert_eq!(artifact.metadata.train_rows, train_idx.len());
        assert_eq!(artifact.metadata.eval_rows, eval_idx.len());
    }

    #[test]
    fn test_fit_requires_rows() {
        let pipeline = TrainingPipeline::new(TrainingConfig::default());
        let err = pipeline.fit(&RawDataset::default()).unwrap_err();
        assert!(matches!(err, TrainingError::NotEnoughRows { found: 0, .. }));
    }

    #[test]
    fn test_explicit_missing_dataset_is_fatal() {
        let config = TrainingConfig {
            dataset_path: Some(PathBuf::from("/nope/StormEvents_details-1999.csv")),
            ..TrainingConfig::default()
        };
        let err = TrainingPipeline::new(config).resolve_dataset().unwrap_err();
        assert!(matches!(err, TrainingError::DatasetNotFound { .. }));
    }
}
