//! Boolean composition of expressions.

use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Expression, Result};

/// A finite boolean tree over [`Expression`] leaves. Every child is owned by
/// exactly one parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Query {
    Expression(Expression),
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
    Not(Box<Query>),
}

impl Query {
    pub fn expression(expression: Expression) -> Self {
        Query::Expression(expression)
    }

    pub fn and(left: Query, right: Query) -> Self {
        Query::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Query, right: Query) -> Self {
        Query::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Query) -> Self {
        Query::Not(Box::new(inner))
    }

    /// Check every leaf for a well-formed field name.
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::Expression(e) => e.validate(),
            Query::And(l, r) | Query::Or(l, r) => {
                l.validate()?;
                r.validate()
            }
            Query::Not(inner) => inner.validate(),
        }
    }

    /// Evaluate against one record. `And`/`Or` short-circuit, so a right-hand
    /// branch that would fail is never reached when the left decides.
    pub fn evaluate(&self, record: &Value) -> Result<bool> {
        match self {
            Query::Expression(e) => e.evaluate(record),
            Query::And(l, r) => Ok(l.evaluate(record)? && r.evaluate(record)?),
            Query::Or(l, r) => Ok(l.evaluate(record)? || r.evaluate(record)?),
            Query::Not(inner) => Ok(!inner.evaluate(record)?),
        }
    }
}

/// Evaluate an optional query; an absent query matches every record.
pub fn matches(query: Option<&Query>, record: &Value) -> Result<bool> {
    match query {
        Some(q) => q.evaluate(record),
        None => Ok(true),
    }
}

impl From<Expression> for Query {
    fn from(expression: Expression) -> Self {
        Query::Expression(expression)
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        Query::and(self, rhs)
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        Query::or(self, rhs)
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        Query::Not(Box::new(self))
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Expression(e) => write!(f, "{}", e),
            Query::And(l, r) => write!(f, "({} AND {})", l, r),
            Query::Or(l, r) => write!(f, "({} OR {})", l, r),
            Query::Not(inner) => match inner.as_ref() {
                Query::Expression(e) => write!(f, "NOT ({})", e),
                composite => write!(f, "NOT {}", composite),
            },
        }
    }
}
