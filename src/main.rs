//! request-observation service.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ observation ─▶ timeout ─▶ handler
//!                                      │
//!                                      ├─▶ metrics facade ─▶ Prometheus exporter
//!                                      └─▶ tracing ─▶ stdout
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use request_observation::config::watcher::ConfigWatcher;
use request_observation::config::{load_config, ServiceConfig};
use request_observation::lifecycle::signals::spawn_signal_listener;
use request_observation::observability::{logging, metrics};
use request_observation::observation::{
    convention_from_config, MetricsObservationHandler, ObservationRegistry,
    TracingObservationHandler,
};
use request_observation::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "request-observation")]
#[command(about = "HTTP service with labelled request metrics", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Watched for changes to `[observation]`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("request-observation v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        convention = ?config.observation.convention,
        metric_name = %config.observation.metric_name,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(
        ObservationRegistry::builder()
            .boxed_convention(convention_from_config(&config.observation))
            .handler(MetricsObservationHandler::new())
            .handler(TracingObservationHandler::new())
            .build(),
    );

    let (updates_tx, config_updates) = mpsc::unbounded_channel();
    if let Some(path) = &cli.config {
        match ConfigWatcher::new(path) {
            Ok(watcher) => {
                tokio::spawn(watcher.run(updates_tx));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config, registry);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
