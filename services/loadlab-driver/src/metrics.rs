//! Request statistics collected during a run.

use crate::client::RequestOutcome;
use loadlab_core::metrics::{DRIVER_LATENCY, DRIVER_REQUESTS};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Counters and latencies for one request name, or for the whole run.
#[derive(Debug, Clone)]
pub struct LoadTestMetrics {
    pub start_time: Instant,
    pub end_time: Instant,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Latencies in microseconds
    pub latencies_us: Vec<u64>,
    /// Failure message -> occurrences
    pub errors: BTreeMap<String, usize>,
}

impl Default for LoadTestMetrics {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            end_time: now,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            latencies_us: Vec::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl LoadTestMetrics {
    fn starting_at(start_time: Instant) -> Self {
        Self {
            start_time,
            end_time: start_time,
            ..Default::default()
        }
    }

    fn record(&mut self, latency: Duration, failure: Option<String>) {
        self.total_requests += 1;
        self.latencies_us.push(latency.as_micros() as u64);
        match failure {
            None => self.successful_requests += 1,
            Some(message) => {
                self.failed_requests += 1;
                *self.errors.entry(message).or_default() += 1;
            }
        }
    }

    /// Calculate error rate (0.0-1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.failed_requests as f64 / self.total_requests as f64
    }

    /// Completed requests per second, successful or not.
    pub fn throughput_rps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_requests as f64 / secs
    }

    pub fn duration(&self) -> Duration {
        self.end_time.duration_since(self.start_time)
    }

    pub fn p50_latency(&self) -> Duration {
        self.percentile(0.50)
    }

    pub fn p90_latency(&self) -> Duration {
        self.percentile(0.90)
    }

    pub fn p95_latency(&self) -> Duration {
        self.percentile(0.95)
    }

    pub fn p99_latency(&self) -> Duration {
        self.percentile(0.99)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_micros(self.latencies_us.iter().copied().max().unwrap_or(0))
    }

    fn percentile(&self, p: f64) -> Duration {
        if self.latencies_us.is_empty() {
            return Duration::ZERO;
        }

        let mut sorted = self.latencies_us.clone();
        sorted.sort_unstable();

        let index = ((sorted.len() as f64) * p) as usize;
        let index = index.min(sorted.len() - 1);

        Duration::from_micros(sorted[index])
    }
}

/// Aggregate plus per-request-name breakdown at one point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub aggregate: LoadTestMetrics,
    pub per_request: BTreeMap<&'static str, LoadTestMetrics>,
}

#[derive(Debug)]
struct CollectorState {
    aggregate: LoadTestMetrics,
    per_request: BTreeMap<&'static str, LoadTestMetrics>,
}

/// Thread-safe collector shared by every virtual user.
///
/// Also mirrors each outcome into the process-wide Prometheus registry.
#[derive(Debug)]
pub struct MetricsCollector {
    state: Mutex<CollectorState>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectorState {
                aggregate: LoadTestMetrics::starting_at(Instant::now()),
                per_request: BTreeMap::new(),
            }),
        }
    }

    pub fn record_success(&self, name: &'static str, latency: Duration) {
        self.record_inner(name, latency, None);
    }

    pub fn record_failure(&self, name: &'static str, latency: Duration, error: String) {
        self.record_inner(name, latency, Some(error));
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        match &outcome.result {
            Ok(()) => self.record_success(outcome.name, outcome.latency),
            Err(failure) => self.record_failure(outcome.name, outcome.latency, failure.to_string()),
        }
    }

    fn record_inner(&self, name: &'static str, latency: Duration, failure: Option<String>) {
        let outcome = if failure.is_some() { "failure" } else { "success" };
        DRIVER_REQUESTS.with_label_values(&[name, outcome]).inc();
        DRIVER_LATENCY
            .with_label_values(&[name])
            .observe(latency.as_secs_f64());

        let mut state = self.state.lock();
        let start = state.aggregate.start_time;
        state
            .per_request
            .entry(name)
            .or_insert_with(|| LoadTestMetrics::starting_at(start))
            .record(latency, failure.clone());
        state.aggregate.record(latency, failure);
    }

    /// Current totals, with `end_time` set to now.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let state = self.state.lock();

        let mut aggregate = state.aggregate.clone();
        aggregate.end_time = now;
        let per_request = state
            .per_request
            .iter()
            .map(|(name, metrics)| {
                let mut metrics = metrics.clone();
                metrics.end_time = now;
                (*name, metrics)
            })
            .collect();

        MetricsSnapshot {
            aggregate,
            per_request,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_error_rate() {
        let metrics = LoadTestMetrics {
            total_requests: 100,
            successful_requests: 98,
            failed_requests: 2,
            ..Default::default()
        };

        assert_eq!(metrics.error_rate(), 0.02);
        assert_eq!(LoadTestMetrics::default().error_rate(), 0.0);
    }

    #[test]
    fn test_metrics_throughput() {
        let start = Instant::now();
        let metrics = LoadTestMetrics {
            start_time: start,
            end_time: start + Duration::from_secs(10),
            total_requests: 1000,
            ..Default::default()
        };

        assert_eq!(metrics.throughput_rps(), 100.0);
    }

    #[test]
    fn test_metrics_percentiles() {
        let metrics = LoadTestMetrics {
            latencies_us: (0..100).map(|i| i * 100).collect(),
            ..Default::default()
        };

        assert_eq!(metrics.p50_latency(), Duration::from_micros(5000));
        assert_eq!(metrics.p95_latency(), Duration::from_micros(9500));
        assert_eq!(metrics.p99_latency(), Duration::from_micros(9900));
        assert_eq!(metrics.max_latency(), Duration::from_micros(9900));
    }

    #[test]
    fn test_collector_groups_by_name_and_reason() {
        let collector = MetricsCollector::new();

        collector.record_success("GET /cpu", Duration::from_millis(10));
        collector.record_success("GET /", Duration::from_millis(1));
        collector.record_failure("GET /cpu", Duration::from_millis(100), "HTTP 500".to_string());
        collector.record_failure("GET /cpu", Duration::from_millis(90), "HTTP 500".to_string());

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.aggregate.total_requests, 4);
        assert_eq!(snapshot.aggregate.failed_requests, 2);
        assert_eq!(snapshot.aggregate.errors["HTTP 500"], 2);

        let cpu = &snapshot.per_request["GET /cpu"];
        assert_eq!(cpu.total_requests, 3);
        assert_eq!(cpu.successful_requests, 1);
        assert_eq!(snapshot.per_request["GET /"].failed_requests, 0);
    }
}
