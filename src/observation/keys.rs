//! Key-value labels attached to observations.
//!
//! # Design Decisions
//! - Insertion order is preserved so label sets are reproducible
//! - Keys are unique: adding an existing key replaces its value in place
//! - Documented key names live in [`LowCardinalityKeyNames`] so conventions
//!   never spell them by hand

use std::fmt;

/// Key names documented for HTTP server observations.
///
/// Custom conventions reuse these so their labels line up with the defaults.
pub struct LowCardinalityKeyNames;

impl LowCardinalityKeyNames {
    /// HTTP method of the request, e.g. `GET`.
    pub const METHOD: &'static str = "method";
    /// Response status code as a decimal string.
    pub const STATUS: &'static str = "status";
    /// Type name of the error raised while handling, or `none`.
    pub const EXCEPTION: &'static str = "exception";
    /// Status class, e.g. `SUCCESS` or `CLIENT_ERROR`.
    pub const OUTCOME: &'static str = "outcome";
    /// Matched route template.
    pub const URI: &'static str = "uri";
}

/// Key names for values that must never become metric dimensions.
pub struct HighCardinalityKeyNames;

impl HighCardinalityKeyNames {
    /// Raw request path.
    pub const HTTP_URL: &'static str = "http.url";
}

/// Value used for the exception key when no error occurred.
pub const NO_EXCEPTION: &str = "none";

/// A single label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    pub fn of(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl From<&KeyValue> for metrics::Label {
    fn from(kv: &KeyValue) -> Self {
        metrics::Label::new(kv.key.clone(), kv.value.clone())
    }
}

/// Ordered set of labels with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    entries: Vec<KeyValue>,
}

impl KeyValues {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from the given labels, in order.
    pub fn of(key_values: impl IntoIterator<Item = KeyValue>) -> Self {
        Self::empty().and_all(key_values)
    }

    /// Add a label. An existing label with the same key keeps its position
    /// and takes the new value.
    pub fn and(mut self, key_value: KeyValue) -> Self {
        match self.entries.iter_mut().find(|kv| kv.key == key_value.key) {
            Some(existing) => existing.value = key_value.value,
            None => self.entries.push(key_value),
        }
        self
    }

    pub fn and_all(self, key_values: impl IntoIterator<Item = KeyValue>) -> Self {
        key_values.into_iter().fold(self, KeyValues::and)
    }

    /// Look up the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in the form the `metrics` macros accept.
    pub fn to_labels(&self) -> Vec<metrics::Label> {
        self.entries.iter().map(metrics::Label::from).collect()
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kv) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", kv)?;
        }
        Ok(())
    }
}

impl IntoIterator for KeyValues {
    type Item = KeyValue;
    type IntoIter = std::vec::IntoIter<KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyValues {
    type Item = &'a KeyValue;
    type IntoIter = std::slice::Iter<'a, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<KeyValue> for KeyValues {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        Self::of(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_preserves_insertion_order() {
        let kvs = KeyValues::empty()
            .and(KeyValue::of("method", "GET"))
            .and(KeyValue::of("status", "200"))
            .and(KeyValue::of("exception", "none"));

        let keys: Vec<&str> = kvs.iter().map(KeyValue::key).collect();
        assert_eq!(keys, vec!["method", "status", "exception"]);
    }

    #[test]
    fn test_and_replaces_duplicate_key_in_place() {
        let kvs = KeyValues::of([
            KeyValue::of("method", "GET"),
            KeyValue::of("tag", "a"),
            KeyValue::of("status", "200"),
        ])
        .and(KeyValue::of("tag", "b"));

        assert_eq!(kvs.len(), 3);
        assert_eq!(kvs.get("tag"), Some("b"));
        assert_eq!(kvs.iter().nth(1).map(KeyValue::key), Some("tag"));
    }

    #[test]
    fn test_get_missing_key() {
        let kvs = KeyValues::of([KeyValue::of("method", "GET")]);
        assert_eq!(kvs.get("user"), None);
        assert!(!kvs.contains_key("user"));
        assert!(KeyValues::empty().is_empty());
    }

    #[test]
    fn test_display() {
        let kvs = KeyValues::of([KeyValue::of("method", "GET"), KeyValue::of("status", "200")]);
        assert_eq!(kvs.to_string(), "method=GET,status=200");
        assert_eq!(KeyValues::empty().to_string(), "");
    }

    #[test]
    fn test_to_labels() {
        let kvs = KeyValues::of([KeyValue::of("tag", "value")]);
        let labels = kvs.to_labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].key(), "tag");
        assert_eq!(labels[0].value(), "value");
    }
}
