//! Scalar values carried from dataset cells into server variables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a column or server variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ValueKind {
    /// The zero/default value a variable of this kind is created with.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Text => Value::Text(String::new()),
        }
    }

    /// Whether a node declared with this kind accepts `value`.
    ///
    /// `Null` is accepted everywhere (an empty cell clears the node) and
    /// integers widen into float nodes.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueKind::Float, Value::Int(_)) => true,
            (kind, value) => value.kind() == Some(kind),
        }
    }

    /// Smallest kind able to hold values of both `self` and `other`.
    pub fn unify(self, other: ValueKind) -> ValueKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ValueKind::Int, ValueKind::Float) | (ValueKind::Float, ValueKind::Int) => {
                ValueKind::Float
            }
            _ => ValueKind::Text,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Kind of this value; `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert this value so that a column of `kind` accepts it.
    ///
    /// Values that cannot be represented in `kind` fall back to their text
    /// rendering when `kind` is `Text`, and to `Null` otherwise.
    pub fn coerce(self, kind: ValueKind) -> Value {
        match (kind, self) {
            (_, Value::Null) => Value::Null,
            (ValueKind::Float, Value::Int(i)) => Value::Float(i as f64),
            (ValueKind::Text, Value::Text(s)) => Value::Text(s),
            (ValueKind::Text, other) => Value::Text(other.to_string()),
            (kind, value) if value.kind() == Some(kind) => value,
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
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

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
