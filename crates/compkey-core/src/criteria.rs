//! Row filters built from key values.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// A single field condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// `field IS NULL`.
    IsNull {
        /// Field name.
        field: String,
    },
    /// `field = value`.
    Eq {
        /// Field name.
        field: String,
        /// Non-null value to compare against.
        value: Value,
    },
}

impl Condition {
    /// Condition matching `value` exactly, or `IS NULL` for a null value.
    pub fn for_value(field: impl Into<String>, value: Value) -> Self {
        let field = field.into();
        if value.is_null() {
            Condition::IsNull { field }
        } else {
            Condition::Eq { field, value }
        }
    }

    /// Field this condition applies to.
    pub fn field(&self) -> &str {
        match self {
            Condition::IsNull { field } | Condition::Eq { field, .. } => field,
        }
    }

    /// Evaluate against a stored row. A missing field reads as null.
    pub fn matches(&self, row: &BTreeMap<String, Value>) -> bool {
        match self {
            Condition::IsNull { field } => row.get(field).map_or(true, Value::is_null),
            Condition::Eq { field, value } => row.get(field).is_some_and(|v| v.matches(value)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::IsNull { field } => write!(f, "{} IS NULL", field),
            Condition::Eq { field, value } => write!(f, "{} = {}", field, value),
        }
    }
}

/// Conjunction of field conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Criteria {
    conditions: Vec<Condition>,
}

impl Criteria {
    /// Create an empty criteria (matches every row).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the null-aware equality filter for a key.
    ///
    /// `fields` and `values` are paired positionally.
    pub fn for_key(fields: &[String], values: &[Value]) -> Self {
        let conditions = fields
            .iter()
            .zip(values)
            .map(|(field, value)| Condition::for_value(field.clone(), value.clone()))
            .collect();
        Self { conditions }
    }

    /// Add a condition.
    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a null-aware equality condition.
    pub fn with_value(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Condition::for_value(field, value.into()))
    }

    /// Conditions in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Check if there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check if a row satisfies every condition.
    pub fn matches(&self, row: &BTreeMap<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_null_value_becomes_is_null() {
        let criteria = Criteria::for_key(
            &["title".to_string(), "categoryId".to_string()],
            &[Value::from("Perpetual Motion Found!"), Value::Null],
        );

        assert_eq!(
            criteria.conditions()[1],
            Condition::IsNull {
                field: "categoryId".into()
            }
        );
        assert_eq!(
            criteria.to_string(),
            "title = 'Perpetual Motion Found!' AND categoryId IS NULL"
        );
    }

    #[test]
    fn test_matching() {
        let criteria = Criteria::new()
            .with_value("title", "A")
            .with_value("categoryId", Value::Null);

        assert!(criteria.matches(&row(&[("title", "A".into()), ("categoryId", Value::Null)])));
        assert!(criteria.matches(&row(&[("title", "A".into())])));
        assert!(!criteria.matches(&row(&[("title", "A".into()), ("categoryId", 2.into())])));
        assert!(!criteria.matches(&row(&[("title", "B".into()), ("categoryId", Value::Null)])));
    }

    #[test]
    fn test_empty_criteria_matches_everything() {
        assert!(Criteria::new().matches(&BTreeMap::new()));
    }
}
