//! Central metrics registry and metric definitions
//!
//! Prometheus metrics for the target and the driver. Metrics are registered
//! lazily in the default registry on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

// ===== Target HTTP Metrics =====

/// Total number of target requests by method, endpoint, and status code
pub static HTTP_REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loadlab_http_requests_total",
        "Total number of HTTP requests served by the target",
        &["method", "endpoint", "status"]
    )
    .expect("Failed to register HTTP request counter")
});

/// Target request duration histogram
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "loadlab_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        // Buckets: 1ms .. 60s, the upper end covers long /mem holds
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register HTTP request duration histogram")
});

/// Requests currently being served
pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "loadlab_active_connections",
        "Number of in-flight HTTP requests on the target"
    )
    .expect("Failed to register active connections gauge")
});

// ===== Workload Metrics =====

/// Wall-clock time spent inside each workload
pub static WORKLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "loadlab_workload_duration_seconds",
        "Workload execution time in seconds",
        &["kind"],
        vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register workload duration histogram")
});

/// Identity lookups by source (metadata, local, sentinel, cached)
pub static IDENTITY_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loadlab_identity_lookups_total",
        "Private identity resolutions by source",
        &["source"]
    )
    .expect("Failed to register identity lookup counter")
});

// ===== Driver Metrics =====

/// Driver requests by request name and outcome (success/failure)
pub static DRIVER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loadlab_driver_requests_total",
        "Requests issued by the load driver",
        &["name", "outcome"]
    )
    .expect("Failed to register driver request counter")
});

/// Driver-observed request latency
pub static DRIVER_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "loadlab_driver_request_latency_seconds",
        "Driver-observed request latency in seconds",
        &["name"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register driver latency histogram")
});

/// Virtual users currently running
pub static ACTIVE_USERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("loadlab_active_users", "Number of running virtual users")
        .expect("Failed to register active users gauge")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_in_default_registry() {
        HTTP_REQUEST_COUNT
            .with_label_values(&["GET", "/cpu", "200"])
            .inc();
        WORKLOAD_DURATION.with_label_values(&["cpu"]).observe(0.01);
        ACTIVE_USERS.set(3);

        let names: Vec<String> = prometheus::gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"loadlab_http_requests_total".to_string()));
        assert!(names.contains(&"loadlab_workload_duration_seconds".to_string()));
        assert!(names.contains(&"loadlab_active_users".to_string()));
    }
}
