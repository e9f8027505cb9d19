//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (observation, timeout, request id, tracing)
//! - Apply `[observation]` changes from config reloads
//! - Serve until shutdown is triggered

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observation::{convention_from_config, ObservableRouter, ObservationRegistry};

/// Errors from running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server exposing the demo routes with request observation.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    registry: Arc<ObservationRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and registry.
    pub fn new(config: ServiceConfig, registry: Arc<ObservationRegistry>) -> Self {
        let router = build_router(&config, registry.clone());
        Self {
            router,
            config,
            registry,
        }
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Config updates only replace the observation convention.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let registry = self.registry.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                registry.replace_convention(convention_from_config(&config.observation));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reload_task.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Answers `408 Request Timeout` once `timeouts.request_secs` elapses.
pub fn request_timeout_layer(config: &ServiceConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeouts.request_secs),
    )
}

/// Build the Axum router with all middleware layers.
///
/// Timeouts sit inside the observation layer so timed-out requests are
/// observed with their 408 status; request ids sit outside so the
/// observation sees them.
pub fn build_router(config: &ServiceConfig, registry: Arc<ObservationRegistry>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/greet", get(handlers::greet))
        .route("/orders/{id}/cancel", post(handlers::cancel_order))
        .route("/panic", get(handlers::trigger_panic))
        .layer(request_timeout_layer(config))
        .with_observation(registry)
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http())
}
