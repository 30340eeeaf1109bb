//! Value tree types
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record of named values (segment, data element or group occurrence)
pub type Record = BTreeMap<String, Value>;

/// A node in the value tree
///
/// Untagged on the wire: a value tree serializes to plain JSON. Datetimes are
/// written as RFC 3339 strings and read back as [`Value::String`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value
    Null,

    /// Boolean value
    Boolean(bool),

    /// Integer value
    Integer(i64),

    /// Decimal value
    Decimal(f64),

    /// String value
    String(String),

    /// Repeated occurrences (segment groups)
    Array(Vec<Value>),

    /// Named children
    Record(Record),

    /// Calendar timestamp with its original offset
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    /// Create an empty record
    pub fn record() -> Self {
        Value::Record(Record::new())
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for null, empty strings, empty arrays and empty records
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Record(record) => record.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a named child of a record
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|record| record.get(name))
    }

    /// Look up a named child of a record for mutation
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.as_record_mut().and_then(|record| record.get_mut(name))
    }

    /// Insert a named child; no-op unless this value is a record
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.as_record_mut()
            .and_then(|record| record.insert(name.into(), value))
    }

    /// Convert scalar to its plain text form
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(dt.to_rfc3339()),
            Value::Array(_) | Value::Record(_) | Value::Null => None,
        }
    }

    /// Convert into a `serde_json` value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => serde_json::Number::from_f64(*d)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Record(record) => serde_json::Value::Object(
                record
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Decimal),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Record(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
