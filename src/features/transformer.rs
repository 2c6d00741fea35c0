//! Fitted imputation + one-hot encoding of event records.
//!
//! This is the one place where training and serving must agree exactly, so all
//! canonicalization (category casing, blank handling, season labels) happens
//! inside the transformer on both paths rather than in its callers.
//!
//! Output layout, fixed at fit time:
//! - numeric block: `month`, `magnitude`, `begin_lat`, `begin_lon`
//! - one-hot blocks: `event_type`, `state`, `season`, `magnitude_type`, each
//!   over its sorted fit-time category set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::event::EventRecord;

/// A model-ready row.
pub type FeatureVector = Vec<f64>;

/// Numeric input columns, in output order.
pub const NUMERIC_COLUMNS: [&str; 4] = ["month", "magnitude", "begin_lat", "begin_lon"];

/// Categorical input columns, in output order.
pub const CATEGORICAL_COLUMNS: [&str; 4] = ["event_type", "state", "season", "magnitude_type"];

fn numeric_values(record: &EventRecord) -> [Option<f64>; 4] {
    [
        record.month.map(f64::from),
        record.magnitude.filter(|v| v.is_finite()),
        record.begin_lat.filter(|v| v.is_finite()),
        record.begin_lon.filter(|v| v.is_finite()),
    ]
}

/// Trimmed, upper-cased category; blanks count as missing.
pub fn canonical_category(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_uppercase())
    }
}

fn categorical_values(record: &EventRecord) -> [Option<String>; 4] {
    [
        record.event_type.as_deref().and_then(canonical_category),
        record.state.as_deref().and_then(canonical_category),
        record.season.map(|s| s.as_str().to_string()),
        record.magnitude_type.as_deref().and_then(canonical_category),
    ]
}

/// Median of the observed values; mean of the two middle values for even counts.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Fit-time state of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Most frequent observed value; ties go to the smallest value.
    pub mode: Option<String>,
    /// Sorted distinct observed values.
    pub categories: Vec<String>,
}

impl CategoricalColumn {
    fn fit(name: &str, values: impl Iterator<Item = String>) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for v in values {
            *counts.entry(v).or_insert(0) += 1;
        }

        // BTreeMap iterates in key order, so strict `>` keeps the smallest key on ties.
        let mut mode: Option<(&String, usize)> = None;
        for (value, &count) in &counts {
            if mode.map_or(true, |(_, best)| count > best) {
                mode = Some((value, count));
            }
        }

        Self {
            name: name.to_string(),
            mode: mode.map(|(v, _)| v.clone()),
            categories: counts.keys().cloned().collect(),
        }
    }

    fn encode_into(&self, value: Option<&str>, out: &mut FeatureVector) {
        let start = out.len();
        out.resize(start + self.categories.len(), 0.0);
        let value = value.or(self.mode.as_deref());
        if let Some(v) = value {
            // Unseen categories leave the whole block at zero.
            if let Ok(idx) = self.categories.binary_search_by(|c| c.as_str().cmp(v)) {
                out[start + idx] = 1.0;
            }
        }
    }
}

/// Unfitted transformer. Fitting is the only thing it can do, so a transform
/// without fit-time state cannot be expressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureTransformer;

impl FeatureTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Learn medians, modes and category sets from the training records.
    pub fn fit(&self, records: &[EventRecord]) -> FittedTransformer {
        let mut numeric_columns: [Vec<f64>; 4] = Default::default();
        let mut categorical_columns: [Vec<String>; 4] = Default::default();

        for record in records {
            for (col, value) in numeric_values(record).into_iter().enumerate() {
                if let Some(v) = value {
                    numeric_columns[col].push(v);
                }
            }
            for (col, value) in categorical_values(record).into_iter().enumerate() {
                if let Some(v) = value {
                    categorical_columns[col].push(v);
                }
            }
        }

        let medians = numeric_columns
            .iter_mut()
            .zip(NUMERIC_COLUMNS)
            .map(|(values, name)| {
                median(values).unwrap_or_else(|| {
                    warn!(column = name, "No observed values; imputing 0.0");
                    0.0
                })
            })
            .collect();

        let categorical = categorical_columns
            .into_iter()
            .zip(CATEGORICAL_COLUMNS)
            .map(|(values, name)| CategoricalColumn::fit(name, values.into_iter()))
            .collect();

        let fitted = FittedTransformer {
            medians,
            categorical,
        };

        debug!(
            rows = records.len(),
            features = fitted.feature_count(),
            "Feature transformer fitted"
        );

        fitted
    }
}

/// Fitted transformer state, persisted inside the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransformer {
    /// Imputation value per entry of `NUMERIC_COLUMNS`.
    medians: Vec<f64>,
    /// One entry per `CATEGORICAL_COLUMNS`.
    categorical: Vec<CategoricalColumn>,
}

impl FittedTransformer {
    /// Transform a single record.
    pub fn transform_one(&self, record: &EventRecord) -> FeatureVector {
        let mut features = Vec::with_capacity(self.feature_count());

        for (value, median) in numeric_values(record).into_iter().zip(&self.medians) {
            features.push(value.unwrap_or(*median));
        }
        for (value, column) in categorical_values(record).into_iter().zip(&self.categorical) {
            column.encode_into(value.as_deref(), &mut features);
        }

        features
    }

    /// Transform a batch using fit-time state only.
    pub fn transform(&self, records: &[EventRecord]) -> Vec<FeatureVector> {
        records.iter().map(|r| self.transform_one(r)).collect()
    }

    /// Width of every produced feature vector.
    pub fn feature_count(&self) -> usize {
        self.medians.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Column names in output order, e.g. `month`, `event_type=HAIL`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect();
        for column in &self.categorical {
            names.extend(
                column
                    .categories
                    .iter()
                    .map(|c| format!("{}={}", column.name, c)),
            );
        }
        names
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    pub fn categorical_columns(&self) -> &[CategoricalColumn] {
        &self.categorical
    }
}
