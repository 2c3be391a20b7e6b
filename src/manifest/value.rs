//! Typed accessors over a raw `serde_json::Value` that report field paths.

use crate::error::{FieldPath, SchemaError};
use serde_json::{Map, Value};

/// Human name of a JSON value's type for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a record",
    }
}

/// A record being validated, together with its location.
pub struct Record<'a> {
    map: &'a Map<String, Value>,
    at: FieldPath,
}

impl<'a> Record<'a> {
    pub fn new(value: &'a Value, at: FieldPath) -> Result<Self, SchemaError> {
        match value {
            Value::Object(map) => Ok(Record { map, at }),
            other => Err(SchemaError::new(
                &at,
                format!("expected a record, found {}", type_name(other)),
            )),
        }
    }

    pub fn field(&self, key: &str) -> FieldPath {
        self.at.key(key)
    }

    /// The raw value under `key`. An explicit `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&'a str>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(SchemaError::new(
                &self.field(key),
                format!("expected a string, found {}", type_name(other)),
            )),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.optional_str(key)?
            .ok_or_else(|| SchemaError::new(&self.field(key), "required field is missing"))
    }

    /// An integer field. Floats such as `2.5` are rejected rather than truncated.
    pub fn optional_integer(&self, key: &str) -> Result<Option<i64>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                SchemaError::new(&self.field(key), format!("expected an integer, found {}", n))
            }),
            Some(other) => Err(SchemaError::new(
                &self.field(key),
                format!("expected an integer, found {}", type_name(other)),
            )),
        }
    }

    pub fn optional_list(&self, key: &str) -> Result<Option<&'a Vec<Value>>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(SchemaError::new(
                &self.field(key),
                format!("expected a list, found {}", type_name(other)),
            )),
        }
    }

    pub fn optional_record(&self, key: &str) -> Result<Option<Record<'a>>, SchemaError> {
        self.get(key)
            .map(|value| Record::new(value, self.field(key)))
            .transpose()
    }

    /// A list of strings, e.g. an argv or a list of patterns.
    pub fn optional_str_list(&self, key: &str) -> Result<Option<Vec<String>>, SchemaError> {
        let Some(items) = self.optional_list(key)? else {
            return Ok(None);
        };
        let at = self.field(key);
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(SchemaError::new(
                    &at.index(i),
                    format!("expected a string, found {}", type_name(other)),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}
