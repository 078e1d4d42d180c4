//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admissions_total` (counter): admission decisions by outcome
//! - `gate_upload_rejections_total` (counter): refused uploads by kind
//! - `gate_tracked_clients` (gauge): live entries per tracker
//! - `gate_requests_total` (counter): HTTP requests by method, status
//! - `gate_request_duration_seconds` (histogram): latency distribution
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(outcome: &'static str) {
    counter!("gate_admissions_total", "outcome" => outcome).increment(1);
}

pub fn record_upload_rejected(kind: &'static str) {
    counter!("gate_upload_rejections_total", "kind" => kind).increment(1);
}

pub fn record_tracked_clients(tracker: &'static str, count: usize) {
    gauge!("gate_tracked_clients", "tracker" => tracker).set(count as f64);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
    ];
    counter!("gate_requests_total", labels.clone()).increment(1);
    histogram!("gate_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}
