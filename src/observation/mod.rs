//! HTTP server request observation.
//!
//! # Data Flow
//! ```text
//! middleware.rs (per request)
//!     → context.rs (method, path, query, status, error)
//!     → registry.rs (active convention + handlers)
//!     → convention.rs / tagged.rs (name, contextual name, labels)
//!     → handler.rs (metrics facade, tracing events)
//! ```
//!
//! # Design Decisions
//! - Conventions are pure and stateless; all state lives in the context
//! - Key names come from `keys.rs`, never spelled inline
//! - Conventions are registered explicitly at startup

pub mod context;
pub mod convention;
pub mod error;
pub mod handler;
pub mod keys;
pub mod middleware;
pub mod registry;
pub mod tagged;

pub use context::{ObservedError, QueryParameters, ServerRequestObservationContext};
pub use convention::{
    DefaultServerRequestObservationConvention, ServerRequestObservationConvention,
    DEFAULT_METRIC_NAME,
};
pub use error::{ObservationError, ObservationResult};
pub use handler::{
    CompletedObservation, MetricsObservationHandler, ObservationHandler,
    TracingObservationHandler,
};
pub use keys::{KeyValue, KeyValues, LowCardinalityKeyNames};
pub use middleware::{observe_request, ObservableRouter};
pub use registry::{convention_from_config, ObservationRegistry, ObservationRegistryBuilder};
pub use tagged::TaggedServerRequestObservationConvention;
