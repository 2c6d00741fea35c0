//! Held-out regression metrics.

use serde::{Deserialize, Serialize};
use smartcore::metrics;

/// Metrics for one target on the evaluation partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub target: String,
    pub rows: usize,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl TargetMetrics {
    pub fn compute(target: &str, actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            target: target.to_string(),
            rows: actual.len(),
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            r2: r2_score(actual, predicted),
        }
    }
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    metrics::mean_squared_error(&actual.to_vec(), &predicted.to_vec()).sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    metrics::mean_absolute_error(&actual.to_vec(), &predicted.to_vec())
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let first = actual[0];
    if actual.iter().all(|&a| a == first) {
        let exact = actual.iter().zip(predicted).all(|(a, p)| a == p);
        return if exact { 1.0 } else { 0.0 };
    }
    metrics::r2(&actual.to_vec(), &predicted.to_vec())
}
