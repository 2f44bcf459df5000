//! Field values exchanged with records and row stores.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically typed field value.
///
/// Deserializes from plain JSON scalars: `null`, booleans, integers, floats
/// and strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null / absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Comparison used when matching stored rows.
    ///
    /// Same as `==` except that integers and floats compare numerically, the
    /// way SQL compares numeric columns. Null never matches here; null
    /// matching goes through an `IS NULL` condition.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }

    /// Whether two key values would select the same stored rows.
    ///
    /// Like [`matches`](Self::matches), except that `Null` equals `Null`.
    pub fn same_key(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            _ => self.matches(other),
        }
    }
}

/// Typed equality: values of different variants are never equal, and
/// `Null == Null`. Two NaN floats are considered equal so that an unchanged
/// NaN field does not read as a change.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Int(1), Value::from(1));
        assert_ne!(Value::Int(1), Value::String("1".into()));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Null, Value::Int(0));
        assert_ne!(Value::String("a".into()), Value::String("A".into()));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_row_matching() {
        assert!(Value::Int(2).matches(&Value::Float(2.0)));
        assert!(Value::from("x").matches(&Value::from("x")));
        assert!(!Value::Null.matches(&Value::Null));
        assert!(!Value::Int(1).matches(&Value::from("1")));
    }

    #[test]
    fn test_same_key() {
        assert!(Value::Null.same_key(&Value::Null));
        assert!(Value::Float(2.0).same_key(&Value::Int(2)));
        assert!(Value::Float(f64::NAN).same_key(&Value::Float(f64::NAN)));
        assert!(!Value::Int(1).same_key(&Value::from("1")));
        assert!(!Value::Null.same_key(&Value::Int(0)));
    }

    #[test]
    fn test_from_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 1.5, "a"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(1.5),
                Value::String("a".into()),
            ]
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("t")), Value::String("t".into()));
    }
}
