//! Test Request Generator
//!
//! Sends random prediction requests over NATS request/reply and logs the
//! severity band of each reply. Falls back to a dry run when NATS is down.
//!
//! Usage: test_requester [NATS_URL] [SUBJECT] [COUNT] [DELAY_MS]

use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use storm_damage::types::{
    DamageSeverity, PredictionRequest, PredictionResult, Season, SeverityThresholds,
};

const EVENT_TYPES: &[&str] = &[
    "Hail",
    "Thunderstorm Wind",
    "Flash Flood",
    "Tornado",
    "Flood",
    "Winter Storm",
    "Heavy Rain",
];

const STATES: &[(&str, f64, f64)] = &[
    ("TEXAS", 31.0, -99.0),
    ("KANSAS", 38.5, -98.0),
    ("OKLAHOMA", 35.5, -97.5),
    ("IOWA", 42.0, -93.5),
    ("FLORIDA", 28.0, -82.0),
    ("NEBRASKA", 41.5, -99.8),
];

struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn generate(&mut self) -> PredictionRequest {
        let event_type = EVENT_TYPES[self.rng.gen_range(0..EVENT_TYPES.len())];
        let (state, lat, lon) = STATES[self.rng.gen_range(0..STATES.len())];
        let month = self.rng.gen_range(1..=12u8);

        let mut request = PredictionRequest::new(event_type, state, month);
        // Leave some fields missing so imputation gets exercised.
        if self.rng.gen_bool(0.5) {
            request.season = Season::from_month(month);
        }
        match event_type {
            "Hail" => {
                request.magnitude = Some(self.rng.gen_range(0.75..3.0));
            }
            "Thunderstorm Wind" => {
                request.magnitude = Some(self.rng.gen_range(50.0..90.0));
                let magnitude_type = if self.rng.gen_bool(0.5) { "EG" } else { "MG" };
                request.magnitude_type = Some(magnitude_type.to_string());
            }
            _ => {}
        }
        if self.rng.gen_bool(0.8) {
            request.begin_lat = Some(lat + self.rng.gen_range(-1.5..1.5));
            request.begin_lon = Some(lon + self.rng.gen_range(-1.5..1.5));
        }
        request
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_requester=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("storm.damage.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(nats_url, subject, count, delay_ms, "Starting test requester");

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let thresholds = SeverityThresholds::default();
    let mut generator = RequestGenerator::new();
    let mut fallbacks = 0u64;

    for i in 0..count {
        let request = generator.generate();
        let payload = serde_json::to_vec(&request)?;

        let reply = client.request(subject.to_string(), payload.into()).await?;
        let result: PredictionResult = serde_json::from_slice(&reply.payload)?;

        if let Some(err) = &result.error {
            fallbacks += 1;
            warn!(error = %err, "Service returned a fallback");
        } else {
            let severity = DamageSeverity::from_total(result.total_damage, &thresholds);
            info!(
                n = i + 1,
                event_type = %request.event_type,
                state = %request.state,
                month = request.month,
                total_damage = format!("{:.0}", result.total_damage),
                severity = severity.as_str(),
                "Prediction"
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(count, fallbacks, "Completed");
    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    for i in 0..count {
        let request = generator.generate();
        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, serde_json::to_string_pretty(&request)?);
        }
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
