//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by route and status
//! - `relay_request_duration_seconds` (histogram): time until response head
//! - `relay_bytes_total` (counter): body bytes received from upstream for relay
//! - `relay_streams_total` (counter): finished relays by outcome
//!   (`completed`, `upstream_error`, `stalled`, `cancelled`)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a handled request.
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("relay_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("relay_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record body bytes received from upstream for relay.
pub fn record_relayed_bytes(bytes: u64) {
    counter!("relay_bytes_total").increment(bytes);
}

/// Record how a streamed relay ended.
pub fn record_stream_outcome(outcome: &'static str) {
    counter!("relay_streams_total", "outcome" => outcome).increment(1);
}
