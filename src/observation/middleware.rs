//! Axum middleware that observes every request.
//!
//! # Data Flow
//! ```text
//! request
//!     → context built from request parts, handlers notified (on_start)
//!     → inner service runs inside a span named by the convention
//!     → status + ObservedError (from response extensions) recorded
//!     → convention derives labels, handlers notified (on_stop)
//!       (or on_abandon if the future is dropped first)
//! response (unchanged apart from the removed ObservedError)
//! ```
//!
//! Observation failures never fail the request: they are logged and the
//! observation degrades.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::Instrument;

use crate::observation::context::{ObservedError, ServerRequestObservationContext};
use crate::observation::convention::ServerRequestObservationConvention;
use crate::observation::handler::CompletedObservation;
use crate::observation::keys::KeyValues;
use crate::observation::registry::ObservationRegistry;

/// Span name used when the convention cannot name the request.
pub const FALLBACK_CONTEXTUAL_NAME: &str = "http";

/// Exception value recorded for requests whose handler panicked.
pub const PANIC_TYPE_NAME: &str = "panic";

/// Observe one request with the registry's current convention.
///
/// Use with [`axum::middleware::from_fn_with_state`], or through
/// [`ObservableRouter::with_observation`].
pub async fn observe_request(
    State(registry): State<Arc<ObservationRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let convention = registry.convention();
    let mut context = ServerRequestObservationContext::from_request(&request);

    for handler in registry.handlers() {
        handler.on_start(convention.name(), &context);
    }
    let in_flight = InFlight {
        registry: registry.clone(),
        convention: convention.clone(),
        context: Some(context.clone()),
    };

    let contextual_name = convention.contextual_name(&context).unwrap_or_else(|e| {
        tracing::warn!(error = %e, path = %context.path(), "Could not name request observation");
        FALLBACK_CONTEXTUAL_NAME.to_string()
    });

    let span = tracing::info_span!(
        "http_request",
        otel.name = %contextual_name,
        request_id = context.request_id().unwrap_or("-"),
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span).await;
    let duration = start.elapsed();
    in_flight.complete();

    context.set_response_status(response.status().as_u16());
    if let Some(error) = response.extensions_mut().remove::<ObservedError>() {
        context.set_error(error);
    }

    let low_cardinality = match convention.low_cardinality_key_values(&context) {
        Ok(labels) => Some(labels),
        Err(e) => {
            tracing::warn!(error = %e, path = %context.path(), "Could not label request observation");
            None
        }
    };
    let high_cardinality = convention
        .high_cardinality_key_values(&context)
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Could not derive high cardinality labels");
            KeyValues::empty()
        });

    let observation = CompletedObservation {
        name: convention.name(),
        contextual_name: &contextual_name,
        low_cardinality,
        high_cardinality,
        duration,
        context: &context,
    };
    for handler in registry.handlers() {
        handler.on_stop(&observation);
    }

    response
}

/// Notifies handlers through `on_abandon` if dropped before `complete`.
///
/// hyper drops the middleware future when the client goes away, so anything
/// raised in `on_start` has to be released here.
struct InFlight {
    registry: Arc<ObservationRegistry>,
    convention: Arc<Box<dyn ServerRequestObservationConvention>>,
    context: Option<ServerRequestObservationContext>,
}

impl InFlight {
    fn complete(mut self) {
        self.context = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            for handler in self.registry.handlers() {
                handler.on_abandon(self.convention.name(), &context);
            }
        }
    }
}

/// Turn a handler panic into a 500 carrying an [`ObservedError`].
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %message, "Request handler panicked");

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    ObservedError::with_type_name(PANIC_TYPE_NAME, message).attach(&mut response);
    response
}

/// Extension trait adding request observation to an axum router.
///
/// ```ignore
/// let registry = Arc::new(
///     ObservationRegistry::builder()
///         .convention(TaggedServerRequestObservationConvention::new())
///         .handler(MetricsObservationHandler::new())
///         .build(),
/// );
/// let app = Router::new()
///     .route("/", get(handler))
///     .with_observation(registry);
/// ```
pub trait ObservableRouter {
    fn with_observation(self, registry: Arc<ObservationRegistry>) -> Self;
}

impl<S> ObservableRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_observation(self, registry: Arc<ObservationRegistry>) -> Self {
        self.layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(registry, observe_request))
    }
}
