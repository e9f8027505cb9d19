//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};

use request_observation::observation::{
    CompletedObservation, KeyValues, ObservationHandler, ObservationRegistry,
    ServerRequestObservationContext, ServerRequestObservationConvention,
};

/// What a [`RecordingHandler`] saw for one request.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub name: String,
    pub contextual_name: String,
    pub labels: Option<KeyValues>,
    pub high_cardinality: KeyValues,
    pub request_id: Option<String>,
}

/// Handler that keeps every observation in memory.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    started: Mutex<usize>,
    abandoned: Mutex<usize>,
    stopped: Mutex<Vec<Recorded>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }

    pub fn abandoned(&self) -> usize {
        *self.abandoned.lock().unwrap()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.stopped.lock().unwrap().clone()
    }

    /// The single observation recorded so far.
    pub fn only(&self) -> Recorded {
        let recorded = self.recorded();
        assert_eq!(recorded.len(), 1, "expected exactly one observation: {:?}", recorded);
        recorded.into_iter().next().unwrap()
    }
}

impl ObservationHandler for RecordingHandler {
    fn on_start(&self, _name: &str, _context: &ServerRequestObservationContext) {
        *self.started.lock().unwrap() += 1;
    }

    fn on_stop(&self, observation: &CompletedObservation<'_>) {
        self.stopped.lock().unwrap().push(Recorded {
            name: observation.name.to_string(),
            contextual_name: observation.contextual_name.to_string(),
            labels: observation.low_cardinality.clone(),
            high_cardinality: observation.high_cardinality.clone(),
            request_id: observation.context.request_id().map(str::to_string),
        });
    }

    fn on_abandon(&self, _name: &str, _context: &ServerRequestObservationContext) {
        *self.abandoned.lock().unwrap() += 1;
    }
}

/// Registry with the given convention and a recording handler.
#[allow(dead_code)]
pub fn recording_registry(
    convention: impl ServerRequestObservationConvention + 'static,
) -> (Arc<ObservationRegistry>, Arc<RecordingHandler>) {
    let recorder = Arc::new(RecordingHandler::default());
    let registry = ObservationRegistry::builder()
        .convention(convention)
        .shared_handler(recorder.clone())
        .build();
    (Arc::new(registry), recorder)
}

/// Render labels as `key=value` strings, in order.
#[allow(dead_code)]
pub fn rendered(labels: &KeyValues) -> Vec<String> {
    labels.iter().map(ToString::to_string).collect()
}
