//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, cache, replica selection)
//! - Install the Prometheus recorder and render the `/metrics` payload
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): requests by method, route, status
//! - `gateway_http_request_duration_seconds` (histogram): latency distribution
//! - `gateway_cache_hits_total` / `gateway_cache_misses_total` (counters)
//! - `gateway_lb_requests_per_replica_total` (counter): selections by service, replica
//! - `gateway_upstream_errors_total` (counter): forwarding failures by service, kind
//!
//! # Design Decisions
//! - Library code records through the `metrics` facade; without an installed
//!   recorder (tests) every call is a no-op
//! - Histogram buckets tuned for typical web latencies

use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.015, 0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 1.0, 2.0, 5.0,
];

/// Install the global Prometheus recorder and return a render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("gateway_http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()
}

/// Record a finished inbound request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    counter!("gateway_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("gateway_cache_misses_total").increment(1);
}

pub fn record_replica_selection(group: &str, replica: &str) {
    counter!(
        "gateway_lb_requests_per_replica_total",
        "service" => group.to_string(),
        "replica" => replica.to_string()
    )
    .increment(1);
}

pub fn record_upstream_error(group: &str, kind: &'static str) {
    counter!(
        "gateway_upstream_errors_total",
        "service" => group.to_string(),
        "kind" => kind
    )
    .increment(1);
}
