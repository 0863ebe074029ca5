//! Pluggable type validation for port values.

use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt;

/// A type validator attached to a port.
///
/// `validate` runs on the content of every data packet sent through an
/// output port and on every value used to initialize an input port.
pub trait TypeValidator: Send + Sync + fmt::Debug {
    /// Name of the validated type, used in diagnostics.
    fn name(&self) -> &str;

    /// Check a value, returning it (possibly normalized) or a message.
    fn validate(&self, value: Value) -> Result<Value, String>;

    /// Convert a value to its primitive (serializable) form.
    fn to_primitive(&self, value: &Value) -> Value {
        value.clone()
    }

    /// Convert a primitive value into the validated form.
    fn to_native(&self, value: Value) -> Result<Value, String> {
        self.validate(value)
    }
}

/// JSON kind accepted by a [`JsonTypeValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    /// Anything.
    Any,
    /// `null`.
    Null,
    /// `true`/`false`.
    Bool,
    /// Integral number.
    Int,
    /// Any number.
    Number,
    /// String.
    String,
    /// Array.
    Array,
    /// Object.
    Object,
}

impl JsonKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Built-in validator for plain JSON kinds.
#[derive(Debug, Clone)]
pub struct JsonTypeValidator {
    kind: JsonKind,
    nullable: bool,
}

impl JsonTypeValidator {
    /// Create a validator accepting `kind`.
    pub fn new(kind: JsonKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Also accept `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Get the accepted kind.
    pub fn kind(&self) -> JsonKind {
        self.kind
    }
}

impl TypeValidator for JsonTypeValidator {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn validate(&self, value: Value) -> Result<Value, String> {
        if self.kind.matches(value.inner()) || (self.nullable && value.is_null()) {
            Ok(value)
        } else {
            Err(format!("expected {}, got {}", self.kind.as_str(), value.inner()))
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, String> {
        let coerced = match (self.kind, value.inner()) {
            (JsonKind::Int, JsonValue::String(_)) => value.as_i64().map(Value::int),
            (JsonKind::Number, JsonValue::String(_)) => value.as_f64().map(Value::float),
            (JsonKind::Bool, JsonValue::String(_)) => value.as_bool().map(Value::bool),
            (JsonKind::String, JsonValue::Number(_) | JsonValue::Bool(_)) => {
                value.as_string().map(Value::string)
            }
            _ => None,
        };
        self.validate(coerced.unwrap_or(value))
    }
}
