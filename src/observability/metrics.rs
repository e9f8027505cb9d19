//! Metrics exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Serve the scrape endpoint on its own listener
//! - Give request durations real histogram buckets
//!
//! Metric names are recorded with dots (`http.server.requests`); the exporter
//! renders them with underscores (`http_server_requests`).

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Histogram buckets for HTTP request durations (in seconds).
pub const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Exporter settings shared by the installed recorder and tests.
///
/// Buckets apply to every histogram rather than one metric name: the request
/// metric can be renamed on config reload, and a name-matched bucket set would
/// silently fall back to summaries after that.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets(HTTP_DURATION_BUCKETS)
}

/// Install the Prometheus exporter and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    prometheus_builder()?.with_http_listener(addr).install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
