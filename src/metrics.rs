//! Request metrics for the prediction service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

use crate::types::prediction::{DamageSeverity, SeverityThresholds};

/// Latency samples kept in memory before the oldest half is dropped.
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector shared by every transport
pub struct ServiceMetrics {
    /// Requests seen, successful or not
    pub requests: AtomicU64,
    /// Requests answered with an estimate
    pub successes: AtomicU64,
    /// Failures keyed by `PredictionError::kind`
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Served totals by severity band
    severity_counts: RwLock<HashMap<DamageSeverity, u64>>,
    thresholds: SeverityThresholds,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::with_thresholds(SeverityThresholds::default())
    }

    pub fn with_thresholds(thresholds: SeverityThresholds) -> Self {
        Self {
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            severity_counts: RwLock::new(HashMap::new()),
            thresholds,
            start_time: Instant::now(),
        }
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }
    }

    /// Record a request answered with an estimate
    pub fn record_success(&self, latency: Duration, total_damage: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);

        let severity = DamageSeverity::from_total(total_damage, &self.thresholds);
        if let Ok(mut counts) = self.severity_counts.write() {
            *counts.entry(severity).or_insert(0) += 1;
        }
    }

    /// Record a request answered with a fallback
    pub fn record_failure(&self, latency: Duration, kind: &'static str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn severity_counts(&self) -> HashMap<DamageSeverity, u64> {
        self.severity_counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latency statistics over the retained samples
    pub fn latency_stats(&self) -> LatencyStats {
        let times = self.latencies.read().unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let latency = self.latency_stats();

        info!(
            requests,
            successes,
            failures = requests.saturating_sub(successes),
            throughput = format!("{:.1} req/s", self.throughput()),
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Prediction metrics"
        );

        for (kind, count) in self.failures_by_kind() {
            info!(kind, count, "Failures by kind");
        }

        let severity = self.severity_counts();
        let served: u64 = severity.values().sum();
        for band in [
            DamageSeverity::Low,
            DamageSeverity::Moderate,
            DamageSeverity::High,
            DamageSeverity::Critical,
        ] {
            let count = severity.get(&band).copied().unwrap_or(0);
            let pct = if served > 0 {
                count as f64 / served as f64 * 100.0
            } else {
                0.0
            };
            info!(severity = band.as_str(), count, pct = format!("{pct:.1}%"), "Severity distribution");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run forever; spawn this on the runtime.
    pub async fn start(self) {
        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}
