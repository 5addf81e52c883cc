//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deploy_imports_total` (counter): imports by outcome (accepted, rejected, failed)
//! - `deploy_import_duration_seconds` (histogram): full import latency
//! - `deploy_validations_total` (counter): validator runs by `valid` (true, false)
//! - `deploy_validator_duration_seconds` (histogram): validator latency

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the end of an import.
pub fn record_import(outcome: &'static str, start: Instant) {
    ::metrics::counter!("deploy_imports_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("deploy_import_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one validator run.
pub fn record_validation(is_valid: bool, start: Instant) {
    let valid = if is_valid { "true" } else { "false" };
    ::metrics::counter!("deploy_validations_total", "valid" => valid).increment(1);
    ::metrics::histogram!("deploy_validator_duration_seconds").record(start.elapsed().as_secs_f64());
}
