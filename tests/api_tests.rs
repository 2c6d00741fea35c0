//! HTTP router tests against a model trained in-process.

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storm_damage::metrics::ServiceMetrics;
use storm_damage::training::dataset::read_dataset_from_reader;
use storm_damage::{create_router, PredictionService, TrainingPipeline};
use tower::ServiceExt; // for oneshot

fn trained_service() -> PredictionService {
    let raw = read_dataset_from_reader(common::synthetic_csv(true).as_bytes()).unwrap();
    let pipeline = TrainingPipeline::new(common::small_training_config(Path::new(".")));
    let artifact = pipeline.fit(&raw).unwrap();
    PredictionService::ready(Arc::new(artifact))
}

fn ready_app() -> Router {
    create_router(Arc::new(trained_service()))
}

fn empty_app() -> Router {
    create_router(Arc::new(PredictionService::uninitialized()))
}

async fn json_response(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&body).expect("Failed to parse JSON")
}

fn post_predict(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get_health() -> Request<Body> {
    Request::builder().uri("/health").body(Body::empty()).unwrap()
}

fn assert_zero_fallback(body: &Value) {
    assert_eq!(body["property_damage"], 0.0);
    assert_eq!(body["crop_damage"], 0.0);
    assert_eq!(body["total_damage"], 0.0);
    assert!(!body["error"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_health_ready() {
    let response = ready_app().oneshot(get_health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_response(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_not_ready() {
    let response = empty_app().oneshot(get_health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_response(response).await["status"], "unavailable");
}

#[tokio::test]
async fn test_predict_success() {
    let payload = json!({
        "EVENT_TYPE": "Hail",
        "STATE": "TEXAS",
        "MONTH": 6,
        "SEASON": "JJA",
        "MAGNITUDE": 1.75
    });
    let response = ready_app()
        .oneshot(post_predict(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_response(response).await;
    assert!(body.get("error").is_none());
    let property = body["property_damage"].as_f64().unwrap();
    let crop = body["crop_damage"].as_f64().unwrap();
    let total = body["total_damage"].as_f64().unwrap();
    assert!(property >= 0.0 && crop >= 0.0);
    assert!((total - (property + crop)).abs() < 1e-6);
}

#[tokio::test]
async fn test_predict_invalid_field() {
    let payload = json!({"event_type": "Hail", "state": "TEXAS", "month": "June"});
    let response = ready_app()
        .oneshot(post_predict(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_zero_fallback(&json_response(response).await);
}

#[tokio::test]
async fn test_predict_malformed_json() {
    let response = ready_app().oneshot(post_predict("{oops")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_zero_fallback(&json_response(response).await);
}

#[tokio::test]
async fn test_predict_not_ready() {
    let payload = json!({"event_type": "Hail", "state": "TEXAS", "month": 6});
    let response = empty_app()
        .oneshot(post_predict(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_zero_fallback(&json_response(response).await);
}

#[tokio::test]
async fn test_predict_records_metrics() {
    let metrics = Arc::new(ServiceMetrics::new());
    let service = trained_service().with_metrics(metrics.clone());
    let app = create_router(Arc::new(service));

    let ok = json!({"event_type": "Flood", "state": "IOWA", "month": 7});
    let bad = json!({"event_type": "Flood", "state": "IOWA", "month": 7, "season": "DJF"});
    app.clone().oneshot(post_predict(ok.to_string())).await.unwrap();
    app.oneshot(post_predict(bad.to_string())).await.unwrap();

    let stats = metrics.latency_stats();
    assert_eq!(stats.count, 2);
    assert_eq!(metrics.failures_by_kind().get("invalid_request"), Some(&1));
}
