//! Explicit registration of the active convention and its handlers.
//!
//! # Design Decisions
//! - Nothing is discovered implicitly: `main` builds the registry and hands it
//!   to the router
//! - The convention sits behind `ArcSwap` so a config reload can replace it
//!   while requests are in flight

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{ConventionKind, ObservationConfig};
use crate::observation::convention::{
    DefaultServerRequestObservationConvention, ServerRequestObservationConvention,
};
use crate::observation::handler::ObservationHandler;
use crate::observation::tagged::TaggedServerRequestObservationConvention;

type BoxedConvention = Box<dyn ServerRequestObservationConvention>;

/// Build the convention selected by configuration.
pub fn convention_from_config(config: &ObservationConfig) -> BoxedConvention {
    match config.convention {
        ConventionKind::Tagged => {
            Box::new(TaggedServerRequestObservationConvention::from_config(config))
        }
        ConventionKind::Default => Box::new(
            DefaultServerRequestObservationConvention::with_name(config.metric_name.clone()),
        ),
    }
}

/// Holds the convention and handlers used by the observation middleware.
pub struct ObservationRegistry {
    convention: ArcSwap<BoxedConvention>,
    handlers: Vec<Arc<dyn ObservationHandler>>,
}

impl ObservationRegistry {
    pub fn builder() -> ObservationRegistryBuilder {
        ObservationRegistryBuilder::default()
    }

    /// Currently active convention.
    pub fn convention(&self) -> Arc<BoxedConvention> {
        self.convention.load_full()
    }

    /// Swap in a new convention. Requests already past label derivation keep
    /// the old one.
    pub fn replace_convention(&self, convention: BoxedConvention) {
        tracing::info!(name = %convention.name(), "Observation convention replaced");
        self.convention.store(Arc::new(convention));
    }

    pub fn handlers(&self) -> &[Arc<dyn ObservationHandler>] {
        &self.handlers
    }
}

impl fmt::Debug for ObservationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationRegistry")
            .field("convention", &self.convention.load_full())
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Builder for [`ObservationRegistry`].
#[derive(Default)]
pub struct ObservationRegistryBuilder {
    convention: Option<BoxedConvention>,
    handlers: Vec<Arc<dyn ObservationHandler>>,
}

impl ObservationRegistryBuilder {
    /// Register the convention. Defaults to the tagged convention.
    pub fn convention(mut self, convention: impl ServerRequestObservationConvention + 'static) -> Self {
        self.convention = Some(Box::new(convention));
        self
    }

    pub fn boxed_convention(mut self, convention: BoxedConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    pub fn handler(mut self, handler: impl ObservationHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn ObservationHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> ObservationRegistry {
        let convention: BoxedConvention = match self.convention {
            Some(convention) => convention,
            None => Box::new(TaggedServerRequestObservationConvention::new()),
        };
        ObservationRegistry {
            convention: ArcSwap::from_pointee(convention),
            handlers: self.handlers,
        }
    }
}
