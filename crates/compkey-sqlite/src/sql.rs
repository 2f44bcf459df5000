//! SQL rendering for key criteria.

use compkey_core::{Condition, Criteria, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::error::{Error, Result};

/// Quote a table or column name as an SQLite identifier.
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Render the `WHERE` clause of a criteria, numbering parameters from `?1`.
///
/// Returns an empty clause for an empty criteria.
pub fn where_clause(criteria: &Criteria) -> Result<(String, Vec<SqlValue>)> {
    let mut parts = Vec::with_capacity(criteria.conditions().len());
    let mut params = Vec::new();

    for condition in criteria.conditions() {
        let column = quote_ident(condition.field())?;
        match condition {
            Condition::IsNull { .. } => parts.push(format!("{} IS NULL", column)),
            Condition::Eq { value, .. } => {
                params.push(to_sql(value));
                parts.push(format!("{} = ?{}", column, params.len()));
            }
        }
    }

    if parts.is_empty() {
        return Ok((String::new(), params));
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), params))
}

/// `SELECT COUNT(*)` over the rows of `table` matching `criteria`.
pub fn count_query(table: &str, criteria: &Criteria) -> Result<(String, Vec<SqlValue>)> {
    let (clause, params) = where_clause(criteria)?;
    Ok((
        format!("SELECT COUNT(*) FROM {}{}", quote_ident(table)?, clause),
        params,
    ))
}

/// `SELECT *` of the first row of `table` matching `criteria`.
pub fn select_query(table: &str, criteria: &Criteria) -> Result<(String, Vec<SqlValue>)> {
    let (clause, params) = where_clause(criteria)?;
    Ok((
        format!("SELECT * FROM {}{} LIMIT 1", quote_ident(table)?, clause),
        params,
    ))
}

/// Convert a field value to an SQLite value.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
    }
}

/// Type affinity of a column, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// Affinity of a declared column type such as `INT(3)` or `VARCHAR(30)`.
    pub fn from_decl(decl: &str) -> Self {
        let decl = decl.to_ascii_uppercase();
        if decl.contains("INT") {
            Affinity::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| decl.contains(t)) {
            Affinity::Text
        } else if decl.is_empty() || decl.contains("BLOB") {
            Affinity::Blob
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| decl.contains(t)) {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }
}

/// Convert a field value to what a column of `affinity` would store.
///
/// Numeric text becomes a number in numeric columns, integral reals become
/// integers in integer columns, and numbers become text in text columns.
pub fn coerce(affinity: Affinity, value: Value) -> Value {
    let value = match value {
        Value::Bool(b) => Value::Int(b as i64),
        other => other,
    };
    match (affinity, value) {
        (Affinity::Integer | Affinity::Numeric, Value::String(s)) => match parse_number(&s) {
            Some(Value::Float(f)) => integral(f),
            Some(number) => number,
            None => Value::String(s),
        },
        (Affinity::Integer | Affinity::Numeric, Value::Float(f)) => integral(f),
        (Affinity::Real, Value::Int(i)) => Value::Float(i as f64),
        (Affinity::Real, Value::String(s)) => match parse_number(&s) {
            Some(Value::Int(i)) => Value::Float(i as f64),
            Some(number) => number,
            None => Value::String(s),
        },
        (Affinity::Text, Value::Int(i)) => Value::String(i.to_string()),
        (Affinity::Text, Value::Float(f)) => Value::String(real_text(f)),
        (_, value) => value,
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(Value::Float(f)),
        _ => None,
    }
}

fn integral(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e18 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

// SQLite renders whole reals with a trailing ".0".
fn real_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1.0e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Convert a stored SQLite value to a field value.
pub fn from_sql(column: &str, value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(Error::UnsupportedValue {
            column: column.to_string(),
            kind: "blob",
        }),
    }
}
