//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method and outcome;
//!   methods outside the standard set are counted as `OTHER`
//! - `gateway_request_duration_seconds` (histogram): time to finish a request, by outcome
//! - `gateway_upstream_bytes_total` (counter): response bytes relayed from upstreams
//! - `gateway_routes` (gauge): registered routes
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and serve it on `addr`. Needs a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Bounded label value for a client-supplied method.
pub fn method_label(method: &str) -> &'static str {
    const KNOWN: [&str; 9] = ["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH"];
    KNOWN
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(method))
        .unwrap_or("OTHER")
}

pub fn record_request(method: &str, outcome: &'static str, started: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method_label(method),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_upstream_bytes(bytes: u64) {
    ::metrics::counter!("gateway_upstream_bytes_total").increment(bytes);
}

pub fn set_route_count(count: usize) {
    ::metrics::gauge!("gateway_routes").set(count as f64);
}
