//! Metrics collection and exposition.
//!
//! # Metrics
//! - `counter_requests_total` (counter): requests by method and status
//! - `counter_request_duration_seconds` (histogram): handler latency
//! - `counter_visitor_count` (gauge): last persisted visitor count

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
///
/// Failure to install is logged and otherwise ignored; the service runs
/// without metrics rather than refusing to start.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "counter_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("counter_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Track the most recently persisted visitor count.
pub fn record_visitor_count(count: u64) {
    metrics::gauge!("counter_visitor_count").set(count as f64);
}
