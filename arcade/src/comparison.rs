//! Relational operators used by query expressions.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// One of the six relational operators an [`Expression`](crate::Expression)
/// can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

/// Operator codes of the standard comparison-predicate vocabulary, for
/// backends that translate expressions into their own query language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredicateOperator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl Comparison {
    pub const ALL: [Comparison; 6] = [
        Comparison::EqualTo,
        Comparison::NotEqualTo,
        Comparison::GreaterThan,
        Comparison::GreaterThanOrEqualTo,
        Comparison::LessThan,
        Comparison::LessThanOrEqualTo,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Comparison::EqualTo => "=",
            Comparison::NotEqualTo => "!=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqualTo => ">=",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqualTo => "<=",
        }
    }

    pub fn operator(&self) -> PredicateOperator {
        match self {
            Comparison::EqualTo => PredicateOperator::EqualTo,
            Comparison::NotEqualTo => PredicateOperator::NotEqualTo,
            Comparison::GreaterThan => PredicateOperator::GreaterThan,
            Comparison::GreaterThanOrEqualTo => PredicateOperator::GreaterThanOrEqualTo,
            Comparison::LessThan => PredicateOperator::LessThan,
            Comparison::LessThanOrEqualTo => PredicateOperator::LessThanOrEqualTo,
        }
    }

    /// Inverse of [`description`](Self::description); `==` is accepted as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "=" | "==" => Some(Comparison::EqualTo),
            "!=" => Some(Comparison::NotEqualTo),
            ">" => Some(Comparison::GreaterThan),
            ">=" => Some(Comparison::GreaterThanOrEqualTo),
            "<" => Some(Comparison::LessThan),
            "<=" => Some(Comparison::LessThanOrEqualTo),
            _ => None,
        }
    }

    /// True for operators that need an ordering rather than plain equality.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparison::EqualTo | Comparison::NotEqualTo)
    }

    /// Whether `stored.cmp(&expected)` yielding `ordering` satisfies this operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::EqualTo => ordering == Ordering::Equal,
            Comparison::NotEqualTo => ordering != Ordering::Equal,
            Comparison::GreaterThan => ordering == Ordering::Greater,
            Comparison::GreaterThanOrEqualTo => ordering != Ordering::Less,
            Comparison::LessThan => ordering == Ordering::Less,
            Comparison::LessThanOrEqualTo => ordering != Ordering::Greater,
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
