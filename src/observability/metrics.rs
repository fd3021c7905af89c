//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, strategy
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_upstream_failures_total` (counter): failed upstream calls by kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, strategy: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "strategy" => strategy
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "strategy" => strategy
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(kind: &'static str) {
    counter!("proxy_upstream_failures_total", "kind" => kind).increment(1);
}
