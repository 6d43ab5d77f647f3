//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tunnel_sessions_total` (counter): sessions by outcome
//!   (`established`, `unavailable`, `method_not_allowed`, `over_capacity`)
//! - `tunnel_connect_attempts_total` (counter): backend dials, failed or not
//! - `tunnel_bytes_total` (counter): relayed bytes by direction
//!   (`client_to_backend`, `backend_to_client`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics exporter started");
            metrics::describe_counter!(
                "tunnel_sessions_total",
                "Tunnel sessions by outcome"
            );
            metrics::describe_counter!(
                "tunnel_connect_attempts_total",
                "Backend connect attempts"
            );
            metrics::describe_counter!(
                "tunnel_bytes_total",
                "Bytes relayed through tunnel sessions by direction"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record a finished admission/connect outcome for one session.
pub fn record_session(outcome: &'static str) {
    metrics::counter!("tunnel_sessions_total", "outcome" => outcome).increment(1);
}

/// Record one backend dial.
pub fn record_connect_attempt() {
    metrics::counter!("tunnel_connect_attempts_total").increment(1);
}

/// Record bytes moved in one relay direction.
pub fn record_relayed_bytes(direction: &'static str, n: usize) {
    metrics::counter!("tunnel_bytes_total", "direction" => direction).increment(n as u64);
}
