//! Record types returned by resource queries.
//!
//! A [`Record`] is an immutable snapshot of one cloud resource (a DNS record,
//! a listener, a task...) as a mapping of field names to JSON values. Records
//! are produced fresh by every query and are never cached.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One resource instance: field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// Ordered records as returned by the provider listing.
///
/// Order is whatever the provider returned and is not stable across calls.
pub type RecordSet = Vec<Record>;

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, QueryError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(QueryError::Transport(format!(
                "expected a JSON object for a record, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Build a record set from a JSON array of objects.
    pub fn set_from_value(value: Value) -> Result<RecordSet, QueryError> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(QueryError::Transport(format!(
                "expected a JSON array of records, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Set a field, returning the record (builder style).
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Look up a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a top-level string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether the record carries the field at all.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Borrow the underlying field map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert the record into a JSON object value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// Human-readable name of a JSON value's type.
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "record",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_accepts_objects() {
        let record = Record::from_value(json!({"Name": "jarombek.com.", "Type": "A"}))
            .expect("object should convert");
        assert_eq!(record.get_str("Name"), Some("jarombek.com."));
        assert_eq!(record.get_str("Type"), Some("A"));
        assert!(record.contains("Type"));
        assert!(!record.contains("TTL"));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Record::from_value(json!(["not", "a", "record"])).unwrap_err();
        assert!(matches!(err, QueryError::Transport(msg) if msg.contains("sequence")));
    }

    #[test]
    fn test_set_from_value() {
        let set = Record::set_from_value(json!([{"Protocol": "HTTP"}, {"Protocol": "HTTPS"}]))
            .expect("array should convert");
        assert_eq!(set.len(), 2);

        let empty = Record::set_from_value(Value::Null).expect("null is an empty set");
        assert!(empty.is_empty());

        assert!(Record::set_from_value(json!({"Protocol": "HTTP"})).is_err());
    }

    #[test]
    fn test_builder_and_display() {
        let record = Record::new().with("Port", 443).with("Protocol", "HTTPS");
        assert_eq!(record.get("Port"), Some(&json!(443)));

        let rendered = record.to_string();
        assert!(rendered.contains("\"Protocol\":\"HTTPS\""));
    }
}
