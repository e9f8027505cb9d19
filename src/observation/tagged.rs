//! Convention adding custom labels on top of the documented defaults.
//!
//! Labels, in order:
//! - `method`, `status`, `exception` (documented key names)
//! - `user`, only when the request carries a `user` query parameter
//! - `tag=value`, on every request
//!
//! The `user` parameter must come from a small, known set of values (tenant
//! or client class). Raw user ids would blow up metric cardinality.

use crate::config::ObservationConfig;
use crate::observation::context::ServerRequestObservationContext;
use crate::observation::convention::{
    self, ServerRequestObservationConvention, DEFAULT_METRIC_NAME,
};
use crate::observation::error::ObservationResult;
use crate::observation::keys::{HighCardinalityKeyNames, KeyValue, KeyValues};

/// Query parameter copied into the `user` label.
pub const DEFAULT_USER_PARAMETER: &str = "user";
/// Key of the label added to every request.
pub const DEFAULT_STATIC_TAG_KEY: &str = "tag";
/// Value of the label added to every request.
pub const DEFAULT_STATIC_TAG_VALUE: &str = "value";

#[derive(Debug, Clone)]
pub struct TaggedServerRequestObservationConvention {
    name: String,
    user_parameter: String,
    static_tag: KeyValue,
}

impl TaggedServerRequestObservationConvention {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_METRIC_NAME.to_string(),
            user_parameter: DEFAULT_USER_PARAMETER.to_string(),
            static_tag: KeyValue::of(DEFAULT_STATIC_TAG_KEY, DEFAULT_STATIC_TAG_VALUE),
        }
    }

    /// Build from validated configuration.
    pub fn from_config(config: &ObservationConfig) -> Self {
        Self {
            name: config.metric_name.clone(),
            user_parameter: config.user_parameter.clone(),
            static_tag: KeyValue::of(
                config.static_tag_key.clone(),
                config.static_tag_value.clone(),
            ),
        }
    }

    /// Labels appended after the documented ones.
    fn additional_key_values(&self, context: &ServerRequestObservationContext) -> KeyValues {
        let mut key_values = KeyValues::empty();

        if let Some(user) = context.query_parameter(&self.user_parameter) {
            key_values = key_values.and(KeyValue::of(self.user_parameter.clone(), user));
        }

        key_values.and(self.static_tag.clone())
    }
}

impl Default for TaggedServerRequestObservationConvention {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerRequestObservationConvention for TaggedServerRequestObservationConvention {
    fn name(&self) -> &str {
        &self.name
    }

    fn contextual_name(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<String> {
        convention::http_method_name(context)
    }

    fn low_cardinality_key_values(
        &self,
        context: &ServerRequestObservationContext,
    ) -> ObservationResult<KeyValues> {
        Ok(KeyValues::of([
            convention::method(context)?,
            convention::status(context)?,
            convention::exception(context),
        ])
        .and_all(self.additional_key_values(context)))
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
