//! Leaf predicates: one field, one operator, one value.
//!
//! Records are evaluated in their JSON form. Equality works between any two
//! values (numbers compare numerically, so `1 == 1.0`); ordering is defined
//! only for number/number and string/string pairs and anything else is a
//! [`AdapterError::TypeMismatch`]. A record without the field never matches.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::{AdapterError, Comparison, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    field: String,
    comparison: Comparison,
    value: Value,
}

impl Expression {
    /// Build an expression from its parts. `field` may be a dotted path
    /// (`"owner.name"`) into nested objects.
    pub fn new<F, V>(field: F, comparison: Comparison, value: V) -> Self
    where
        F: Into<String>,
        V: Into<Value>,
    {
        Self {
            field: field.into(),
            comparison,
            value: value.into(),
        }
    }

    pub fn equal<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::EqualTo, value)
    }

    pub fn not_equal<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::NotEqualTo, value)
    }

    pub fn greater_than<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::GreaterThan, value)
    }

    pub fn greater_than_or_equal<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::GreaterThanOrEqualTo, value)
    }

    pub fn less_than<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::LessThan, value)
    }

    pub fn less_than_or_equal<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::new(field, Comparison::LessThanOrEqualTo, value)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Reject empty field names and empty path segments.
    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(AdapterError::Validation("empty field name".into()));
        }
        if self.field.split('.').any(str::is_empty) {
            return Err(AdapterError::Validation(format!(
                "malformed field path '{}'",
                self.field
            )));
        }
        Ok(())
    }

    /// Evaluate against one record in its JSON form.
    pub fn evaluate(&self, record: &Value) -> Result<bool> {
        self.validate()?;
        let Some(stored) = lookup(record, &self.field) else {
            return Ok(false);
        };
        match self.comparison {
            Comparison::EqualTo => Ok(values_equal(stored, &self.value)),
            Comparison::NotEqualTo => Ok(!values_equal(stored, &self.value)),
            ordering_op => {
                let ordering = compare_values(&self.field, stored, &self.value)?;
                Ok(ordering_op.matches(ordering))
            }
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.comparison, self.value)
    }
}

/// Resolve a dotted path inside nested JSON objects.
pub(crate) fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.as_object()?.get(segment))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Order `stored` against `expected`, or explain why the two cannot be ordered.
pub(crate) fn compare_values(field: &str, stored: &Value, expected: &Value) -> Result<Ordering> {
    let ordering = match (stored, expected) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    };
    ordering.ok_or_else(|| AdapterError::TypeMismatch {
        field: field.to_string(),
        expected: kind(expected),
        found: kind(stored),
    })
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
