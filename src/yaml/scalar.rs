//! yaml::scalar
//!
//! Scalar values written at the end of a property path.

use std::fmt;

use serde_yaml::{Number, Value};

/// A string, number, or boolean leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl ScalarValue {
    /// Convert to a YAML value for insertion into a tree.
    pub fn to_yaml(&self) -> Value {
        match self {
            ScalarValue::String(s) => Value::String(s.clone()),
            ScalarValue::Number(n) => Value::Number(n.clone()),
            ScalarValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Parse `true` or `false`.
    pub fn parse_bool(raw: &str) -> Option<Self> {
        match raw {
            "true" => Some(ScalarValue::Bool(true)),
            "false" => Some(ScalarValue::Bool(false)),
            _ => None,
        }
    }

    /// Parse an integer or a finite decimal number.
    pub fn parse_number(raw: &str) -> Option<Self> {
        if let Ok(n) = raw.parse::<i64>() {
            return Some(ScalarValue::Number(n.into()));
        }
        if let Ok(n) = raw.parse::<u64>() {
            return Some(ScalarValue::Number(n.into()));
        }
        // Rust accepts "inf" and "NaN" as floats; YAML values should not.
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && raw.bytes().any(|b| b.is_ascii_digit()) => {
                Some(ScalarValue::Number(n.into()))
            }
            _ => None,
        }
    }

    /// Pick the most specific scalar for raw text.
    ///
    /// Booleans are tried first, then numbers, and anything else stays a
    /// string.
    pub fn infer(raw: &str) -> Self {
        Self::parse_bool(raw)
            .or_else(|| Self::parse_number(raw))
            .unwrap_or_else(|| ScalarValue::String(raw.to_string()))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => write!(f, "{}", s),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(s)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Number(n.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n.into())
    }
}
