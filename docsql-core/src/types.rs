use bytes::Bytes;
use serde::Serialize;

use crate::{Error, Result};

/// Literal value carried by a filter
///
/// Filters can hold any JSON-like value, but only the scalar subset can be
/// bound to a prepared statement (see [`BindValue`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Bytes),
    Array(Vec<Value>),
    /// Object entries in insertion order
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn blob(b: impl Into<Bytes>) -> Self {
        Value::Blob(b.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Runtime type tag used in structural fingerprints
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "int",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Convert a parsed JSON value. Integers that fit in i64 stay integers.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Blob(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Value accepted by the storage driver for a `?` placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Bytes),
}

impl BindValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BindValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BindValue::Null => "null",
            BindValue::Bool(_) => "bool",
            BindValue::Integer(_) => "int",
            BindValue::Real(_) => "real",
            BindValue::Text(_) => "text",
            BindValue::Blob(_) => "blob",
        }
    }
}

impl TryFrom<&Value> for BindValue {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(BindValue::Null),
            Value::Bool(b) => Ok(BindValue::Bool(*b)),
            Value::Integer(n) => Ok(BindValue::Integer(*n)),
            Value::Real(f) => Ok(BindValue::Real(*f)),
            Value::Text(s) => Ok(BindValue::Text(s.clone())),
            Value::Blob(b) => Ok(BindValue::Blob(b.clone())),
            Value::Array(_) | Value::Object(_) => Err(Error::TypeMismatch(format!(
                "{} values cannot be bound as SQL parameters",
                value.type_tag()
            ))),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::Text(s.to_string())
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::Text(s)
    }
}

impl From<i64> for BindValue {
    fn from(n: i64) -> Self {
        BindValue::Integer(n)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Real(f)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

/// Parameterized SQL text plus its bind values, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<BindValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Fragment that matches every row
    pub fn match_all() -> Self {
        Self::new("1=1", Vec::new())
    }

    /// Number of `?` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}
