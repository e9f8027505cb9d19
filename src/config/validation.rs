//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Keep label keys unique: configured keys may not shadow documented ones
//! - Validate value ranges (timeouts > 0, addresses parse)

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ConventionKind, ServiceConfig};
use crate::observation::LowCardinalityKeyNames;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observation.{field} must not be empty")]
    Empty { field: &'static str },

    #[error("observation.{field} `{key}` collides with another label key")]
    KeyCollision { field: &'static str, key: String },
}

const RESERVED_KEYS: [&str; 3] = [
    LowCardinalityKeyNames::METHOD,
    LowCardinalityKeyNames::STATUS,
    LowCardinalityKeyNames::EXCEPTION,
];

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let observation = &config.observation;
    if observation.metric_name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "metric_name" });
    }

    if observation.convention == ConventionKind::Tagged {
        let user = observation.user_parameter.as_str();
        let tag = observation.static_tag_key.as_str();

        if user.is_empty() {
            errors.push(ValidationError::Empty { field: "user_parameter" });
        } else if RESERVED_KEYS.contains(&user) {
            errors.push(ValidationError::KeyCollision {
                field: "user_parameter",
                key: user.to_string(),
            });
        }

        if tag.is_empty() {
            errors.push(ValidationError::Empty { field: "static_tag_key" });
        } else if RESERVED_KEYS.contains(&tag) || tag == user {
            errors.push(ValidationError::KeyCollision {
                field: "static_tag_key",
                key: tag.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_tag_key_collisions() {
        let mut config = ServiceConfig::default();
        config.observation.static_tag_key = "status".to_string();
        config.observation.user_parameter = "method".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::KeyCollision {
            field: "user_parameter",
            key: "method".to_string(),
        }));
    }

    #[test]
    fn test_tag_key_equal_to_user_parameter() {
        let mut config = ServiceConfig::default();
        config.observation.static_tag_key = "user".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::KeyCollision {
                field: "static_tag_key",
                key: "user".to_string(),
            }]
        );
    }

    #[test]
    fn test_default_convention_ignores_tag_settings() {
        let mut config = ServiceConfig::default();
        config.observation.convention = ConventionKind::Default;
        config.observation.static_tag_key = String::new();

        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_ranges_and_addresses() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.timeouts.request_secs = 0;
        config.observation.metric_name = " ".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroTimeout));
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nope".to_string();

        assert_eq!(validate_config(&config), Ok(()));
    }
}
