//! Metrics collection and exposition.
//!
//! # Metrics
//! - `platform_requests_total` (counter): requests by method, status
//! - `platform_request_duration_seconds` (histogram): handler latency
//! - `platform_rate_limited_total` (counter): rejected requests by tier
//! - `platform_rate_limiter_fail_open_total` (counter): admissions while the
//!   counter store was unavailable
//! - `platform_audit_writes_total` (counter): audit writes by outcome
//! - `platform_audit_pruned_total` (counter): records removed by retention
//! - `platform_jobs_total` (counter): background jobs by job, outcome
//!
//! Updates go through the `metrics` facade and are no-ops until
//! [`init_metrics`] installs the Prometheus recorder.

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

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("platform_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    histogram!("platform_request_duration_seconds", "method" => method.to_string(), "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(tier: &'static str) {
    counter!("platform_rate_limited_total", "tier" => tier).increment(1);
}

pub fn record_rate_limiter_fail_open() {
    counter!("platform_rate_limiter_fail_open_total").increment(1);
}

pub fn record_audit_write(outcome: &'static str) {
    counter!("platform_audit_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_audit_pruned(count: u64) {
    counter!("platform_audit_pruned_total").increment(count);
}

pub fn record_job(job: &'static str, outcome: &'static str) {
    counter!("platform_jobs_total", "job" => job, "outcome" => outcome).increment(1);
}
