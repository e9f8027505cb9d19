//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every section is defaulted so an empty file is a valid config.

use serde::{Deserialize, Serialize};

use crate::observation::tagged::{
    DEFAULT_STATIC_TAG_KEY, DEFAULT_STATIC_TAG_VALUE, DEFAULT_USER_PARAMETER,
};
use crate::observation::DEFAULT_METRIC_NAME;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics exporter settings.
    pub observability: ObservabilityConfig,

    /// How request observations are named and labelled.
    pub observation: ObservationConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Which convention labels request observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConventionKind {
    /// Documented labels plus `user` and the static tag.
    #[default]
    Tagged,
    /// Documented labels plus `outcome` and `uri`.
    Default,
}

/// Request observation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservationConfig {
    pub convention: ConventionKind,

    /// Metric family name.
    pub metric_name: String,

    /// Query parameter copied into a label of the same name (tagged only).
    pub user_parameter: String,

    /// Label added to every request (tagged only).
    pub static_tag_key: String,
    pub static_tag_value: String,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            convention: ConventionKind::default(),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            user_parameter: DEFAULT_USER_PARAMETER.to_string(),
            static_tag_key: DEFAULT_STATIC_TAG_KEY.to_string(),
            static_tag_value: DEFAULT_STATIC_TAG_VALUE.to_string(),
        }
    }
}
