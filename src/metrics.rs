//! Poll metrics collection and reporting
//!
//! Tracks tick latencies and the success rate of the wallet tracker.

use crate::constants::METRICS_WINDOW;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Aggregated poll metrics
#[derive(Debug, Clone, PartialEq)]
pub struct PollMetrics {
    /// 50th percentile tick duration in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile tick duration in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0) over the lifetime of the tracker
    pub success_rate: f64,
    pub total_polls: u64,
    pub failed_polls: u64,
}

impl PollMetrics {
    /// Creates metrics with no data
    pub fn empty() -> Self {
        Self {
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_polls: 0,
            failed_polls: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct PollSample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<PollSample>,
    total: u64,
    failed: u64,
}

/// Collects poll samples in a rolling window
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished tick
    pub async fn record_poll(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total += 1;
        if !success {
            counters.failed += 1;
        }

        if counters.samples.len() >= METRICS_WINDOW {
            counters.samples.pop_front();
        }
        counters.samples.push_back(PollSample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> PollMetrics {
        let counters = self.counters.read().await;
        if counters.samples.is_empty() {
            return PollMetrics::empty();
        }

        // Latency percentiles only over successful ticks
        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        PollMetrics {
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate: (counters.total - counters.failed) as f64 / counters.total as f64,
            total_polls: counters.total,
            failed_polls: counters.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
