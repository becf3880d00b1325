//! Field value shaping for record writes.
//!
//! The platform expects every field of a written record as `{"value": x}`.
//! Callers may hand over plain values or values they already wrapped; both
//! normalize to the same wire shape.

use serde_json::{Map, Value};

/// Record fields keyed by widget name (or widget id).
pub type FieldMap = Map<String, Value>;

const VALUE_KEY: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A plain value that still needs wrapping.
    Scalar(Value),
    /// The inner value of an object already shaped as `{"value": x}`.
    Wrapped(Value),
}

impl FieldValue {
    /// Classify a JSON value. Only an object whose single key is `value`
    /// counts as wrapped.
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut obj) if obj.len() == 1 && obj.contains_key(VALUE_KEY) => {
                FieldValue::Wrapped(obj.remove(VALUE_KEY).unwrap_or(Value::Null))
            }
            other => FieldValue::Scalar(other),
        }
    }

    pub fn inner(&self) -> &Value {
        match self {
            FieldValue::Scalar(v) | FieldValue::Wrapped(v) => v,
        }
    }

    /// Wire shape: `{"value": x}`.
    pub fn into_wire(self) -> Value {
        let inner = match self {
            FieldValue::Scalar(v) | FieldValue::Wrapped(v) => v,
        };
        let mut obj = Map::with_capacity(1);
        obj.insert(VALUE_KEY.to_string(), inner);
        Value::Object(obj)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::classify(value)
    }
}

/// Wrap every field; already wrapped fields pass through unchanged.
pub fn wrap_fields(fields: FieldMap) -> FieldMap {
    fields
        .into_iter()
        .map(|(k, v)| (k, FieldValue::classify(v).into_wire()))
        .collect()
}

/// Read a field from a record, accepting both `{"value": x}` and plain `x`.
pub fn field_value<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).map(unwrap_field)
}

/// Inner value of `{"value": x}`, or the value itself.
pub fn unwrap_field(raw: &Value) -> &Value {
    match raw {
        Value::Object(obj) if obj.len() == 1 => obj.get(VALUE_KEY).unwrap_or(raw),
        _ => raw,
    }
}
