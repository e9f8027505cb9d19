//! Process-wide observability bootstrap.
//!
//! # Data Flow
//! ```text
//! observation middleware produces:
//!     → logging.rs (tracing subscriber: spans + structured events)
//!     → metrics.rs (Prometheus exporter behind the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - Both are installed once from `main`; library code only uses the facades
//! - `RUST_LOG` overrides the configured log level

pub mod logging;
pub mod metrics;
