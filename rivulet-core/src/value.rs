//! Dynamic packet content.
//!
//! Packet content is opaque to the runtime. It is carried as a JSON value so
//! that initial values from graph documents, type validators and fan-out
//! cloning all work on a single representation.

use crate::error::{Result, RivuletError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Dynamic value carried by packets and initializers.
///
/// Wraps `serde_json::Value` and adds typed accessors used by components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a floating-point value.
    pub fn float(v: f64) -> Self {
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Parse a value from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map(Self)
            .map_err(|e| RivuletError::Serialization {
                cause: format!("failed to parse value: {}", e),
            })
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.0)
            .map_err(|e| RivuletError::Serialization {
                cause: format!("failed to serialize value: {}", e),
            })
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Get a field by dotted path (`"a.b"`, `"items[0].name"`).
    ///
    /// Returns None if the field doesn't exist.
    pub fn get_field(&self, path: &str) -> Option<Value> {
        let path = path.strip_prefix("$.").unwrap_or(path);

        let mut current = &self.0;
        for part in path.split('.') {
            if let Some((field, idx_str)) = part.split_once('[') {
                if !field.is_empty() {
                    current = current.get(field)?;
                }
                let idx: usize = idx_str.strip_suffix(']')?.parse().ok()?;
                current = current.get(idx)?;
            } else {
                current = current.get(part)?;
            }
        }
        Some(Value(current.clone()))
    }

    /// Convert to string if possible.
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            _ => Some(self.0.to_string()),
        }
    }

    /// Borrow as a string slice if the value is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Convert to i64 if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to f64 if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to bool if possible.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.0 {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            JsonValue::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
            JsonValue::Null => Some(false),
            _ => None,
        }
    }

    /// Access the inner serde_json::Value.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner serde_json::Value.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            JsonValue::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self(JsonValue::Number(v.into()))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_field_access() {
        let value = Value(json!({
            "result": {
                "status": "success",
                "items": [{"count": 42}]
            }
        }));

        assert_eq!(
            value.get_field("result.status").and_then(|v| v.as_string()),
            Some("success".to_string())
        );
        assert_eq!(
            value
                .get_field("$.result.items[0].count")
                .and_then(|v| v.as_i64()),
            Some(42)
        );
        assert!(value.get_field("missing").is_none());
    }

    #[test]
    fn numeric_coercions() {
        assert_eq!(Value::string(" 12 ").as_i64(), Some(12));
        assert_eq!(Value::int(3).as_f64(), Some(3.0));
        assert_eq!(Value::string("yes").as_bool(), Some(true));
        assert!(Value::float(f64::NAN).is_null());
    }

    #[test]
    fn json_text_roundtrip() {
        let value = Value::from_json(r#"{"a": [1, 2]}"#).unwrap();
        assert_eq!(value.to_json().unwrap(), r#"{"a":[1,2]}"#);
        assert!(Value::from_json("{").is_err());
    }

    #[test]
    fn display_strips_string_quotes() {
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(Value::int(5).to_string(), "5");
    }
}
