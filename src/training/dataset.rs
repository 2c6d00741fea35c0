//! StormEvents CSV discovery and ingest.
//!
//! Headers are matched case-insensitively so both NOAA's upper-case exports
//! and lower-case hand-made files work. Only the columns the pipeline needs
//! are extracted; everything else is ignored.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::TrainingError;

/// File name pattern searched for in the data directory.
pub const DATASET_PATTERN: &str = "StormEvents_details-*.csv";
const DATASET_PREFIX: &str = "StormEvents_details-";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "event_type",
    "state",
    "begin_date_time",
    "magnitude",
    "magnitude_type",
    "begin_lat",
    "begin_lon",
    "damage_property",
];

/// Optional second target column.
pub const CROP_COLUMN: &str = "damage_crops";

/// One raw row, before label parsing and temporal derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEventRow {
    pub event_type: Option<String>,
    pub state: Option<String>,
    pub begin_date_time: Option<String>,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
    pub begin_lat: Option<f64>,
    pub begin_lon: Option<f64>,
    pub damage_property: Option<String>,
    pub damage_crops: Option<String>,
}

/// A CSV line that could not be read at all.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub rows: Vec<RawEventRow>,
    /// Whether a `damage_crops` column was present.
    pub has_crop_column: bool,
    pub row_errors: Vec<RowError>,
}

/// Find the dataset in `dir`. When several files match, the
/// lexicographically first is used so runs are reproducible.
pub fn locate_dataset(dir: &Path) -> Result<PathBuf, TrainingError> {
    let not_found = || TrainingError::DatasetNotFound {
        dir: dir.to_path_buf(),
        pattern: DATASET_PATTERN.to_string(),
    };

    let entries = fs::read_dir(dir).map_err(|_| not_found())?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(DATASET_PREFIX) && n.ends_with(".csv"))
        })
        .collect();
    matches.sort();

    if matches.len() > 1 {
        debug!(candidates = matches.len(), "Multiple datasets found, using the first");
    }
    matches.into_iter().next().ok_or_else(not_found)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Blank or non-numeric cells are missing values, not errors.
fn number(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    text(record, idx)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Read a dataset from any CSV source.
pub fn read_dataset_from_reader<R: Read>(source: R) -> Result<RawDataset, TrainingError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let header_map = build_header_map(reader.headers()?);
    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(TrainingError::MissingColumn(column.to_string()));
        }
    }
    let col = |name: &str| header_map.get(name).copied();
    let has_crop_column = header_map.contains_key(CROP_COLUMN);

    let mut dataset = RawDataset {
        has_crop_column,
        ..Default::default()
    };

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                dataset.row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        dataset.rows.push(RawEventRow {
            event_type: text(&record, col("event_type")),
            state: text(&record, col("state")),
            begin_date_time: text(&record, col("begin_date_time")),
            magnitude: number(&record, col("magnitude")),
            magnitude_type: text(&record, col("magnitude_type")),
            begin_lat: number(&record, col("begin_lat")),
            begin_lon: number(&record, col("begin_lon")),
            damage_property: text(&record, col("damage_property")),
            damage_crops: text(&record, col(CROP_COLUMN)),
        });
    }

    if !dataset.row_errors.is_empty() {
        warn!(
            skipped = dataset.row_errors.len(),
            first_line = dataset.row_errors[0].line,
            "Skipped unreadable CSV rows"
        );
    }

    Ok(dataset)
}

/// Read the dataset file at `path`.
pub fn read_dataset(path: &Path) -> Result<RawDataset, TrainingError> {
    info!(path = %path.display(), "Loading dataset");
    let file = File::open(path).map_err(|source| TrainingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_dataset_from_reader(file)?;
    info!(
        rows = dataset.rows.len(),
        crop_target = dataset.has_crop_column,
        "Dataset loaded"
    );
    Ok(dataset)
}
