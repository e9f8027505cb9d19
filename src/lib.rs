//! HTTP server request observation for axum services.
//!
//! Every request is named and labelled by a [`ServerRequestObservationConvention`]
//! registered explicitly with an [`ObservationRegistry`]; completed
//! observations are forwarded to the `metrics` facade and to `tracing`.
//!
//! [`ServerRequestObservationConvention`]: observation::ServerRequestObservationConvention
//! [`ObservationRegistry`]: observation::ObservationRegistry

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod observation;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observation::{ObservationRegistry, TaggedServerRequestObservationConvention};
