//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses by route, status
//! - `gateway_response_bytes_total` (counter): body bytes written
//! - `gateway_active_connections` (gauge): live connection count
//! - `gateway_connection_outcomes_total` (counter): how connections ended
//! - `gateway_frames_stored_total` (counter): frames published to the cache
//! - `gateway_frame_bytes` (gauge): size of the most recent frame
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, body_bytes: usize) {
    counter!("gateway_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    counter!("gateway_response_bytes_total").increment(body_bytes as u64);
}

pub fn record_connection_opened() {
    gauge!("gateway_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("gateway_active_connections").decrement(1.0);
}

pub fn record_connection_outcome(outcome: &'static str) {
    counter!("gateway_connection_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_frame_stored(bytes: usize) {
    counter!("gateway_frames_stored_total").increment(1);
    gauge!("gateway_frame_bytes").set(bytes as f64);
}
