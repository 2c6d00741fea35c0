//! Random forest damage model: one smartcore forest per target.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::error::{PredictionError, TrainingError};
use crate::models::DamageModel;

type TargetForest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters. Defaults follow the usual random-forest regressor
/// settings: every feature considered at each split, fully grown trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features examined at each split, in (0, 1].
    pub max_features_fraction: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features_fraction: 1.0,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn features_per_split(&self, n_features: usize) -> usize {
        let fraction = if self.max_features_fraction > 0.0 {
            self.max_features_fraction.min(1.0)
        } else {
            1.0
        };
        ((n_features as f64 * fraction).ceil() as usize).clamp(1, n_features.max(1))
    }

    /// Parameters for the forest of output `target`. Each target gets its
    /// own seed so the forests are fitted independently.
    fn regressor_params(&self, n_features: usize, target: usize) -> RandomForestRegressorParameters {
        let mut params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_estimators.max(1))
            .with_min_samples_split(self.min_samples_split.max(2))
            .with_min_samples_leaf(self.min_samples_leaf.max(1))
            .with_m(self.features_per_split(n_features))
            .with_seed(self.seed.wrapping_add(target as u64));
        if let Some(depth) = self.max_depth {
            params = params.with_max_depth(depth.min(u16::MAX as usize) as u16);
        }
        params
    }
}

/// Fitted multi-output random forest.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegressionForest {
    /// One forest per output, in output order.
    forests: Vec<TargetForest>,
    n_features: usize,
}

impl RegressionForest {
    /// Fit on feature rows `x` and target rows `y` (one or more outputs per row).
    pub fn fit(x: &[Vec<f64>], y: &[Vec<f64>], params: &ForestParams) -> Result<Self, TrainingError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TrainingError::Model(format!(
                "need matching non-empty feature and target rows, got {} and {}",
                x.len(),
                y.len()
            )));
        }

        let n_features = x[0].len();
        let n_outputs = y[0].len();
        info!(
            rows = x.len(),
            features = n_features,
            outputs = n_outputs,
            trees = params.n_estimators,
            features_per_split = params.features_per_split(n_features),
            "Fitting regression forest"
        );

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec());
        let forests = (0..n_outputs)
            .into_par_iter()
            .map(|target| {
                let column: Vec<f64> = y.iter().map(|row| row[target]).collect();
                TargetForest::fit(&matrix, &column, params.regressor_params(n_features, target))
                    .map_err(|e| TrainingError::Model(format!("output {target}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            forests,
            n_features,
        })
    }
}

impl DamageModel for RegressionForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_outputs(&self) -> usize {
        self.forests.len()
    }

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError::FeatureWidth {
                expected: self.n_features,
                found: features.len(),
            });
        }

        let row = DenseMatrix::from_2d_vec(&vec![features.to_vec()]);
        self.forests
            .iter()
            .map(|forest| {
                let predicted = forest
                    .predict(&row)
                    .map_err(|e| PredictionError::Model(e.to_string()))?;
                predicted
                    .first()
                    .copied()
                    .ok_or_else(|| PredictionError::Model("forest returned no prediction".to_string()))
            })
            .collect()
    }
}
