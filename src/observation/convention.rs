//! Conventions that name and label HTTP server request observations.
//!
//! # Responsibilities
//! - Define the convention seam the middleware calls into
//! - Provide the documented key-value builders shared by conventions
//! - Provide the default convention (method, status, exception, outcome, uri)

use std::fmt;

use crate::observation::context::ServerRequestObservationContext;
use crate::observation::error::{ObservationError, ObservationResult};
use crate::observation::keys::{
    HighCardinalityKeyNames, KeyValue, KeyValues, LowCardinalityKeyNames, NO_EXCEPTION,
};

/// Metric family name used by the built-in conventions.
pub const DEFAULT_METRIC_NAME: &str = "http.server.requests";

/// Names and labels an HTTP server request observation.
///
/// Implementations must be pure: the same context always yields the same
/// output, and no call may block.
pub trait ServerRequestObservationConvention: Send + Sync + fmt::Debug {
    /// Metric family name.
    fn name(&self) -> &str;

    /// Human-readable name for the request span.
    fn contextual_name(&self, context: &ServerRequestObservationContext)
        -> ObservationResult<String>;

    /// Labels safe to use as metric dimensions.
    fn low_cardinality_key_values(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<KeyValues>;

    /// Labels for traces and logs only.
    fn high_cardinality_key_values(
        &self,
        _context: &ServerRequestObservationContext,
    ) -> ObservationResult<KeyValues> {
        Ok(KeyValues::empty())
    }
}

/// `"http " + lowercase(method)`.
pub fn http_method_name(context: &ServerRequestObservationContext) -> ObservationResult<String> {
    let method = context
        .method()
        .ok_or(ObservationError::InvalidContext { field: "method" })?;
    Ok(format!("http {}", method.to_lowercase()))
}

/// `method` label, with the verb exactly as received.
pub fn method(context: &ServerRequestObservationContext) -> ObservationResult<KeyValue> {
    let method = context
        .method()
        .ok_or(ObservationError::InvalidContext { field: "method" })?;
    Ok(KeyValue::of(LowCardinalityKeyNames::METHOD, method))
}

/// `status` label. Fails until the response status is known.
pub fn status(context: &ServerRequestObservationContext) -> ObservationResult<KeyValue> {
    let status = context
        .response_status()
        .ok_or(ObservationError::IncompleteContext {
            field: "response status",
        })?;
    Ok(KeyValue::of(LowCardinalityKeyNames::STATUS, status.to_string()))
}

/// `exception` label: the error's type name, or `none`.
pub fn exception(context: &ServerRequestObservationContext) -> KeyValue {
    let value = context
        .error()
        .map(|e| e.type_name())
        .unwrap_or(NO_EXCEPTION);
    KeyValue::of(LowCardinalityKeyNames::EXCEPTION, value)
}

/// `outcome` label derived from the status class.
pub fn outcome(context: &ServerRequestObservationContext) -> KeyValue {
    let value = match context.response_status() {
        Some(100..=199) => "INFORMATIONAL",
        Some(200..=299) => "SUCCESS",
        Some(300..=399) => "REDIRECTION",
        Some(400..=499) => "CLIENT_ERROR",
        Some(500..=599) => "SERVER_ERROR",
        _ => "UNKNOWN",
    };
    KeyValue::of(LowCardinalityKeyNames::OUTCOME, value)
}

/// `uri` label: the matched route, never the raw path.
pub fn uri(context: &ServerRequestObservationContext) -> KeyValue {
    let value = match (context.route(), context.response_status()) {
        (Some(route), _) => route,
        (None, Some(300..=399)) => "REDIRECTION",
        (None, Some(404)) => "NOT_FOUND",
        (None, _) if context.path().is_empty() || context.path() == "/" => "root",
        (None, _) => "UNKNOWN",
    };
    KeyValue::of(LowCardinalityKeyNames::URI, value)
}

/// The framework's stock labelling.
#[derive(Debug, Clone)]
pub struct DefaultServerRequestObservationConvention {
    name: String,
}

impl DefaultServerRequestObservationConvention {
    pub fn new() -> Self {
        Self::with_name(DEFAULT_METRIC_NAME)
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for DefaultServerRequestObservationConvention {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerRequestObservationConvention for DefaultServerRequestObservationConvention {
    fn name(&self) -> &str {
        &self.name
    }

    fn contextual_name(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<String> {
        let name = http_method_name(context)?;
        Ok(match context.route() {
            Some(route) => format!("{} {}", name, route),
            None => name,
        })
    }

    fn low_cardinality_key_values(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<KeyValues> {
        Ok(KeyValues::of([
            method(context)?,
            status(context)?,
            exception(context),
            outcome(context),
            uri(context),
        ]))
    }

    fn high_cardinality_key_values(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<KeyValues> {
        Ok(KeyValues::of([KeyValue::of(
            HighCardinalityKeyNames::HTTP_URL,
            context.path(),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::context::ObservedError;

    fn completed(status: u16) -> ServerRequestObservationContext {
        ServerRequestObservationContext::new()
            .with_method("GET")
            .with_path("/orders/42")
            .with_response_status(status)
    }

    #[test]
    fn test_outcome_mapping() {
        let cases = [
            (101, "INFORMATIONAL"),
            (204, "SUCCESS"),
            (302, "REDIRECTION"),
            (404, "CLIENT_ERROR"),
            (503, "SERVER_ERROR"),
            (99, "UNKNOWN"),
        ];
        for (status, expected) in cases {
            assert_eq!(outcome(&completed(status)).value(), expected, "status {}", status);
        }
        assert_eq!(outcome(&ServerRequestObservationContext::new()).value(), "UNKNOWN");
    }

    #[test]
    fn test_uri_prefers_route() {
        let ctx = completed(404).with_route("/orders/{id}");
        assert_eq!(uri(&ctx).value(), "/orders/{id}");
    }

    #[test]
    fn test_uri_fallbacks() {
        assert_eq!(uri(&completed(404)).value(), "NOT_FOUND");
        assert_eq!(uri(&completed(301)).value(), "REDIRECTION");
        assert_eq!(uri(&completed(200)).value(), "UNKNOWN");
        assert_eq!(uri(&completed(200).with_path("/")).value(), "root");
    }

    #[test]
    fn test_default_labels() {
        let convention = DefaultServerRequestObservationConvention::new();
        let ctx = completed(200).with_route("/orders/{id}");
        let labels = convention.low_cardinality_key_values(&ctx).unwrap();

        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "method=GET",
                "status=200",
                "exception=none",
                "outcome=SUCCESS",
                "uri=/orders/{id}",
            ]
        );
    }

    #[test]
    fn test_default_contextual_name_includes_route() {
        let convention = DefaultServerRequestObservationConvention::new();
        assert_eq!(convention.contextual_name(&completed(200)).unwrap(), "http get");
        assert_eq!(
            convention
                .contextual_name(&completed(200).with_route("/orders/{id}"))
                .unwrap(),
            "http get /orders/{id}"
        );
    }

    #[test]
    fn test_default_high_cardinality() {
        let convention = DefaultServerRequestObservationConvention::new();
        let high = convention.high_cardinality_key_values(&completed(200)).unwrap();
        assert_eq!(high.get("http.url"), Some("/orders/42"));
    }

    #[test]
    fn test_exception_uses_type_name() {
        let ctx = completed(500).with_error(ObservedError::with_type_name("app::Failure", "x"));
        assert_eq!(exception(&ctx).value(), "app::Failure");
        assert_eq!(exception(&completed(200)).value(), "none");
    }

    #[test]
    fn test_status_requires_completion() {
        let ctx = ServerRequestObservationContext::new().with_method("GET");
        assert_eq!(
            status(&ctx),
            Err(ObservationError::IncompleteContext {
                field: "response status"
            })
        );
    }
}
