//! Metrics collection and exposition.
//!
//! # Metrics
//! - `access_log_lines_total` (counter): lines written to the sink
//! - `access_log_write_errors_total` (counter): lines the sink rejected
//! - `access_log_render_errors_total` (counter): lines that failed to render
//! - `panics_total{type="http"}` (counter): handler panics answered with a 500
//!
//! # Design Decisions
//! - Counters go through the `metrics` facade; without an installed
//!   recorder every update is a no-op
//! - The Prometheus exporter is only installed by the server binary

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_line_written() {
    ::metrics::counter!("access_log_lines_total").increment(1);
}

pub fn record_write_error() {
    ::metrics::counter!("access_log_write_errors_total").increment(1);
}

pub fn record_render_error() {
    ::metrics::counter!("access_log_render_errors_total").increment(1);
}

pub fn record_panic() {
    ::metrics::counter!("panics_total", "type" => "http").increment(1);
}
