//! Request metrics and statistics tracking for the churn prediction service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for prediction traffic
pub struct PredictionMetrics {
    /// Total requests received
    pub requests: AtomicU64,
    /// Requests that ended in a churn prediction
    pub churn_predicted: AtomicU64,
    /// Failed requests by error code
    failures_by_code: RwLock<HashMap<&'static str, u64>>,
    /// Processing times of successful requests (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Churn probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            churn_predicted: AtomicU64::new(0),
            failures_by_code: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, probability: f64, churn: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if churn {
            self.churn_predicted.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, code: &'static str) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_code) = self.failures_by_code.write() {
            *by_code.entry(code).or_insert(0) += 1;
        }
    }

    /// Total failed requests
    pub fn failures(&self) -> u64 {
        self.get_failures_by_code().values().sum()
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get churn probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Get failures by error code
    pub fn get_failures_by_code(&self) -> HashMap<&'static str, u64> {
        self.failures_by_code
            .read()
            .map(|by_code| by_code.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let churn = self.churn_predicted.load(Ordering::Relaxed);
        let failures = self.failures();
        let scored = requests.saturating_sub(failures);
        let churn_rate = if scored > 0 {
            (churn as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();

        info!(
            requests = requests,
            scored = scored,
            failures = failures,
            churn_predicted = churn,
            churn_rate = format!("{:.1}%", churn_rate),
            throughput = format!("{:.1} req/s", throughput),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Prediction metrics summary"
        );

        for (code, count) in &self.get_failures_by_code() {
            info!(error = %code, count = count, "Failures by code");
        }

        let distribution = self.get_probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "  p(churn) {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Metrics reporter that logs periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PredictionMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.2, false);
        metrics.record_prediction(Duration::from_micros(200), 0.8, true);
        metrics.record_failure("unprocessable_feature");

        assert_eq!(metrics.requests.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.churn_predicted.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failures(), 1);
        assert_eq!(
            metrics.get_failures_by_code().get("unprocessable_feature"),
            Some(&1)
        );

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 150);
        assert_eq!(stats.max_us, 200);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = PredictionMetrics::new();

        metrics.record_prediction(Duration::from_micros(10), 0.05, false);
        metrics.record_prediction(Duration::from_micros(10), 0.41, true);
        metrics.record_prediction(Duration::from_micros(10), 1.0, true);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution[4], 1);
        assert_eq!(distribution[9], 1);
    }
}
