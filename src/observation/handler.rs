//! Observation handlers: where completed observations go.
//!
//! # Responsibilities
//! - Forward labelled durations to the `metrics` facade
//! - Emit one structured log event per request
//!
//! # Metrics
//! - `<name>` (histogram): request duration in seconds, low-cardinality labels
//! - `<name>.active` (gauge): requests in flight, by method

use std::fmt;
use std::time::Duration;

use crate::observation::context::ServerRequestObservationContext;
use crate::observation::keys::{KeyValues, LowCardinalityKeyNames};

/// Result of one request observation, handed to every handler.
#[derive(Debug)]
pub struct CompletedObservation<'a> {
    /// Metric family name from the convention.
    pub name: &'a str,
    pub contextual_name: &'a str,
    /// `None` when the convention could not derive labels; nothing should be
    /// recorded under the metric name in that case.
    pub low_cardinality: Option<KeyValues>,
    pub high_cardinality: KeyValues,
    pub duration: Duration,
    pub context: &'a ServerRequestObservationContext,
}

/// Receives observation lifecycle events.
pub trait ObservationHandler: Send + Sync + fmt::Debug {
    /// Called when a request enters, before the inner service runs.
    fn on_start(&self, _name: &str, _context: &ServerRequestObservationContext) {}

    /// Called once the response is produced.
    fn on_stop(&self, observation: &CompletedObservation<'_>);

    /// Called instead of `on_stop` when the request future is dropped before
    /// a response exists (client disconnect, outer timeout).
    fn on_abandon(&self, _name: &str, _context: &ServerRequestObservationContext) {}
}

/// Records observations through the global `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct MetricsObservationHandler;

impl MetricsObservationHandler {
    pub fn new() -> Self {
        Self
    }

    fn active_gauge(name: &str, context: &ServerRequestObservationContext) -> metrics::Gauge {
        metrics::gauge!(
            format!("{}.active", name),
            LowCardinalityKeyNames::METHOD => context.method().unwrap_or("UNKNOWN").to_string()
        )
    }
}

impl ObservationHandler for MetricsObservationHandler {
    fn on_start(&self, name: &str, context: &ServerRequestObservationContext) {
        Self::active_gauge(name, context).increment(1.0);
    }

    fn on_stop(&self, observation: &CompletedObservation<'_>) {
        Self::active_gauge(observation.name, observation.context).decrement(1.0);

        if let Some(labels) = &observation.low_cardinality {
            metrics::histogram!(observation.name.to_string(), labels.to_labels())
                .record(observation.duration.as_secs_f64());
        }
    }

    fn on_abandon(&self, name: &str, context: &ServerRequestObservationContext) {
        Self::active_gauge(name, context).decrement(1.0);
    }
}

/// Logs each observation as a structured `tracing` event.
#[derive(Debug, Clone, Default)]
pub struct TracingObservationHandler;

impl TracingObservationHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ObservationHandler for TracingObservationHandler {
    fn on_stop(&self, observation: &CompletedObservation<'_>) {
        let request_id = observation.context.request_id().unwrap_or("-");
        let duration_ms = observation.duration.as_secs_f64() * 1000.0;

        match &observation.low_cardinality {
            Some(labels) => tracing::info!(
                name = %observation.name,
                contextual_name = %observation.contextual_name,
                labels = %labels,
                high_cardinality = %observation.high_cardinality,
                request_id = %request_id,
                duration_ms,
                "Request observed"
            ),
            None => tracing::debug!(
                name = %observation.name,
                contextual_name = %observation.contextual_name,
                request_id = %request_id,
                duration_ms,
                "Request observed without labels"
            ),
        }
    }

    fn on_abandon(&self, name: &str, context: &ServerRequestObservationContext) {
        tracing::debug!(
            name = %name,
            path = %context.path(),
            request_id = %context.request_id().unwrap_or("-"),
            "Request dropped before a response was produced"
        );
    }
}
