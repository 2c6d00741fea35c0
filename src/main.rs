//! Storm Damage Estimator - serving entry point
//!
//! Loads the fitted artifact, then serves predictions over HTTP and, when
//! enabled, NATS request/reply.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use storm_damage::{
    config::{AppConfig, NatsConfig},
    consumer::PredictionConsumer,
    create_router, logging,
    metrics::{MetricsReporter, ServiceMetrics},
    producer::ResultPublisher,
    service::{PredictionService, ServiceState},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging)?;

    info!("Starting Storm Damage Estimator");

    let metrics = Arc::new(ServiceMetrics::new());

    // Fatal: never accept traffic without a model.
    let service = PredictionService::load(&config.artifact.path)
        .with_context(|| format!("failed to load artifact {}", config.artifact.path.display()))?
        .with_metrics(metrics.clone());
    if let ServiceState::Ready(engine) = service.state() {
        let artifact = engine.artifact();
        info!(
            artifact_id = %artifact.artifact_id(),
            created_at = %artifact.metadata.created_at,
            targets = ?artifact.metadata.targets,
            features = engine.feature_count(),
            "Model ready"
        );
    }
    let service = Arc::new(service);

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    if config.nats.enabled {
        let client = async_nats::connect(&config.nats.url)
            .await
            .with_context(|| format!("failed to connect to NATS at {}", config.nats.url))?;
        info!(url = %config.nats.url, "Connected to NATS");

        let nats = config.nats.clone();
        let workers = config.pipeline.workers.max(1);
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = run_nats_workers(client, nats, workers, service).await {
                error!(error = %e, "NATS worker loop stopped");
            }
        });
    }

    let app = create_router(service);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down...");
    metrics.log_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Answer NATS requests with at most `workers` in flight.
async fn run_nats_workers(
    client: async_nats::Client,
    nats: NatsConfig,
    workers: usize,
    service: Arc<PredictionService>,
) -> Result<()> {
    let consumer = PredictionConsumer::new(client.clone(), &nats);
    let publisher = Arc::new(ResultPublisher::new(client, &nats.result_subject));

    info!(
        workers,
        requests = %consumer.subject(),
        queue_group = consumer.queue_group().unwrap_or("-"),
        results = %publisher.result_subject(),
        "Starting NATS request loop"
    );

    let semaphore = Arc::new(Semaphore::new(workers));
    let handled = Arc::new(AtomicU64::new(0));
    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let service = service.clone();
        let publisher = publisher.clone();
        let handled = handled.clone();

        tokio::spawn(async move {
            let result = service.handle_bytes(&message.payload);

            if let Err(e) = publisher.publish(message.reply.as_ref(), &result).await {
                error!(error = %e, "Failed to publish prediction result");
            }

            let count = handled.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                info!(handled = count, "NATS milestone");
            }

            drop(permit);
        });
    }

    Ok(())
}
