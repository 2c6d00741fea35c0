//! The prediction service shared by every transport.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ArtifactError, PredictionError};
use crate::metrics::ServiceMetrics;
use crate::models::artifact::FittedArtifact;
use crate::models::inference::InferenceEngine;
use crate::models::loader::load_artifact;
use crate::types::prediction::{DamageEstimate, PredictionRequest, PredictionResult};

/// Lifecycle state. There is no way back from `Ready`.
#[derive(Debug, Clone)]
pub enum ServiceState {
    Uninitialized,
    Ready(InferenceEngine),
}

/// Turns prediction requests into damage estimates.
///
/// Cheap to share behind an `Arc`: the read path takes no locks.
pub struct PredictionService {
    state: ServiceState,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl PredictionService {
    /// A service with no model. Every request fails with `NotReady`.
    pub fn uninitialized() -> Self {
        Self {
            state: ServiceState::Uninitialized,
            metrics: None,
        }
    }

    pub fn ready(artifact: Arc<FittedArtifact>) -> Self {
        Self {
            state: ServiceState::Ready(InferenceEngine::new(artifact)),
            metrics: None,
        }
    }

    /// Load the artifact at `path`. Blocking; call before accepting traffic.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let artifact = load_artifact(path)?;
        Ok(Self::ready(Arc::new(artifact)))
    }

    /// Attach a metrics collector. `predict` alone does not record.
    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Predict for an already normalized request.
    pub fn predict(&self, request: &PredictionRequest) -> Result<DamageEstimate, PredictionError> {
        let engine = match &self.state {
            ServiceState::Ready(engine) => engine,
            ServiceState::Uninitialized => return Err(PredictionError::NotReady),
        };

        let record = request.to_record()?;
        let raw = engine.predict(&record)?;
        Ok(DamageEstimate::from_components(raw.property, raw.crop))
    }

    fn parse_and_predict(&self, payload: &Value) -> Result<DamageEstimate, PredictionError> {
        if !self.is_ready() {
            return Err(PredictionError::NotReady);
        }
        let request = PredictionRequest::from_value(payload)?;
        self.predict(&request)
    }

    /// Explicit-result path for a raw JSON payload. Records metrics.
    pub fn predict_value(&self, payload: &Value) -> Result<DamageEstimate, PredictionError> {
        let started = Instant::now();
        let outcome = self.parse_and_predict(payload);
        self.observe(started, &outcome);
        outcome
    }

    /// Explicit-result path for an undecoded body. Records metrics.
    pub fn predict_bytes(&self, body: &[u8]) -> Result<DamageEstimate, PredictionError> {
        let started = Instant::now();
        let outcome = serde_json::from_slice::<Value>(body)
            .map_err(|e| PredictionError::invalid("body", format!("malformed JSON: {e}")))
            .and_then(|payload| self.parse_and_predict(&payload));
        self.observe(started, &outcome);
        outcome
    }

    /// Boundary entry point: never fails, errors become a zeroed fallback.
    pub fn handle(&self, payload: &Value) -> PredictionResult {
        self.predict_value(payload).into()
    }

    /// Same as [`handle`](Self::handle) for an undecoded body.
    pub fn handle_bytes(&self, body: &[u8]) -> PredictionResult {
        self.predict_bytes(body).into()
    }

    fn observe(&self, started: Instant, outcome: &Result<DamageEstimate, PredictionError>) {
        let elapsed = started.elapsed();
        match outcome {
            Ok(estimate) => {
                debug!(
                    property = estimate.property_damage,
                    crop = estimate.crop_damage,
                    total = estimate.total_damage,
                    latency_us = elapsed.as_micros() as u64,
                    "Prediction served"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(elapsed, estimate.total_damage);
                }
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Prediction failed, returning fallback");
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(elapsed, err.kind());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::transformer::FeatureTransformer;
    use crate::models::artifact::ArtifactMetadata;
    use crate::models::forest::{ForestParams, RegressionForest};
    use crate::types::event::EventRecord;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn tiny_artifact(with_crop: bool) -> Arc<FittedArtifact> {
        let records = vec![
            EventRecord::new("Hail", "TEXAS", 6).with_magnitude(1.75, None),
            EventRecord::new("Hail", "KANSAS", 5).with_magnitude(1.0, None),
            EventRecord::new("Flood", "TEXAS", 9),
            EventRecord::new("Tornado", "OKLAHOMA", 4).with_location(35.4, -97.5),
        ];
        let targets: Vec<Vec<f64>> = [5_000.0, 1_000.0, 20_000.0, 2_000_000.0]
            .iter()
            .map(|&p| if with_crop { vec![p, p / 10.0] } else { vec![p] })
            .collect();

        let transformer = FeatureTransformer::new().fit(&records);
        let x = transformer.transform(&records);
        let params = ForestParams {
            n_estimators: 8,
            ..ForestParams::default()
        };
        let model = RegressionForest::fit(&x, &targets, &params).unwrap();
        let metadata = ArtifactMetadata {
            artifact_id: "test".to_string(),
            created_at: Utc::now(),
            targets: if with_crop {
                vec!["property_damage".to_string(), "crop_damage".to_string()]
            } else {
                vec!["property_damage".to_string()]
            },
            feature_names: transformer.feature_names(),
            train_rows: records.len(),
            eval_rows: 0,
            dropped_rows: 0,
            evaluation: Vec::new(),
        };
        Arc::new(FittedArtifact::new(metadata, transformer, model))
    }

    #[test]
    fn test_uninitialized_fails_fast() {
        let service = PredictionService::uninitialized();
        assert!(!service.is_ready());

        let request = PredictionRequest::new("Hail", "TEXAS", 6);
        assert_eq!(service.predict(&request), Err(PredictionError::NotReady));

        let result = service.handle(&json!({"event_type": "Hail", "state": "TEXAS", "month": 6}));
        assert_eq!(result.total_damage, 0.0);
        assert!(result.is_error());
    }

    #[test]
    fn test_handle_returns_non_negative_estimate() {
        let service = PredictionService::ready(tiny_artifact(true));
        let result = service.handle(&json!({
            "EVENT_TYPE": "Hail", "STATE": "TEXAS", "MONTH": 6, "SEASON": "JJA"
        }));

        assert!(result.error.is_none(), "{:?}", result.error);
        assert!(result.property_damage.is_finite() && result.property_damage >= 0.0);
        assert!(result.crop_damage.is_finite() && result.crop_damage >= 0.0);
        assert!((result.total_damage - (result.property_damage + result.crop_damage)).abs() < 1e-6);
    }

    #[test]
    fn test_single_output_model_reports_zero_crop() {
        let service = PredictionService::ready(tiny_artifact(false));
        let estimate = service
            .predict(&PredictionRequest::new("Flood", "TEXAS", 9))
            .unwrap();
        assert_eq!(estimate.crop_damage, 0.0);
        assert_eq!(estimate.total_damage, estimate.property_damage);
    }

    #[test]
    fn test_malformed_field_yields_fallback() {
        let metrics = Arc::new(ServiceMetrics::new());
        let service = PredictionService::ready(tiny_artifact(true)).with_metrics(metrics.clone());

        let result = service.handle(&json!({
            "event_type": "Hail", "state": "TEXAS", "month": 6, "magnitude": "lots"
        }));
        assert_eq!(result.property_damage, 0.0);
        assert_eq!(result.crop_damage, 0.0);
        assert_eq!(result.total_damage, 0.0);
        assert!(result.error.unwrap().contains("magnitude"));

        assert_eq!(metrics.requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failures_by_kind().get("invalid_request"), Some(&1));
    }

    #[test]
    fn test_handle_bytes_rejects_bad_json() {
        let service = PredictionService::ready(tiny_artifact(true));
        let result = service.handle_bytes(b"{not json");
        assert!(result.is_error());

        let result = service.handle_bytes(br#"{"event_type":"Hail","state":"TEXAS","month":"6"}"#);
        assert!(!result.is_error());
    }

    #[test]
    fn test_unseen_categories_still_predict() {
        let service = PredictionService::ready(tiny_artifact(true));
        let estimate = service
            .predict(&PredictionRequest::new("Volcanic Ash", "GUAM", 1))
            .unwrap();
        assert!(estimate.total_damage.is_finite());
    }
}
