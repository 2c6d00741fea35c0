//! HTTP transport: `POST /predict` and `GET /health`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::PredictionError;
use crate::service::PredictionService;
use crate::types::prediction::PredictionResult;

/// Status code for a failed prediction. The body is the fallback result
/// either way.
pub fn status_for(err: &PredictionError) -> StatusCode {
    match err {
        PredictionError::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        PredictionError::FeatureWidth { .. } | PredictionError::Model(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn create_router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn health_check(State(service): State<Arc<PredictionService>>) -> impl IntoResponse {
    if service.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}

// Takes raw bytes so malformed JSON still gets the fallback body.
async fn predict(
    State(service): State<Arc<PredictionService>>,
    body: Bytes,
) -> (StatusCode, Json<PredictionResult>) {
    match service.predict_bytes(&body) {
        Ok(estimate) => (StatusCode::OK, Json(estimate.into())),
        Err(err) => (status_for(&err), Json(PredictionResult::fallback(&err))),
    }
}
