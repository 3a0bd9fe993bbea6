//! # Filter Descriptors
//!
//! A filter is a `{column, operator, value}` triple narrowing a read. Filters
//! combine with AND logic; their order only affects the generated query text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operators
///
/// Deserializing (or [`FilterOperator::parse_lenient`]) never fails: an
/// unrecognized operator string becomes [`FilterOperator::Eq`] and a warning
/// is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Case-sensitive substring match
    Like,
    /// Case-insensitive substring match
    Ilike,
    /// Value in list. Only built programmatically (batch delete).
    In,
}

impl FilterOperator {
    /// Operators a caller may name in a filter descriptor
    pub const NAMED: [FilterOperator; 8] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Like,
        FilterOperator::Ilike,
    ];

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::Ilike => "ilike",
            FilterOperator::In => "in",
        }
    }

    /// Parse a named operator, case-insensitively
    pub fn parse(op: &str) -> Option<Self> {
        let op = op.trim().to_ascii_lowercase();
        Self::NAMED.into_iter().find(|named| named.as_str() == op)
    }

    /// Parse a named operator, falling back to equality
    pub fn parse_lenient(op: &str) -> Self {
        Self::parse(op).unwrap_or_else(|| {
            tracing::warn!(operator = op, "unrecognized filter operator, using eq");
            FilterOperator::Eq
        })
    }

    /// Whether the operator is a substring match
    pub fn is_pattern(&self) -> bool {
        matches!(self, FilterOperator::Like | FilterOperator::Ilike)
    }
}

impl From<String> for FilterOperator {
    fn from(op: String) -> Self {
        Self::parse_lenient(&op)
    }
}

/// A filter descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Column to filter on
    pub column: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a filter from an operator string, falling back to equality
    pub fn from_parts(column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::parse_lenient(operator), value)
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Neq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Lte, value)
    }

    /// Case-sensitive substring filter
    pub fn like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Like, value)
    }

    /// Case-insensitive substring filter
    pub fn ilike(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Ilike, value)
    }
}

/// Parse a `column.operator.value` argument.
///
/// A missing operator segment makes the rest of the text the value of an
/// equality filter, e.g. `station.MOBIL`. An unknown one does the same
/// (`notes.a.b` compares against `a.b`) but is logged.
pub fn parse_filter_arg(arg: &str) -> Result<Filter, String> {
    let (column, rest) = arg
        .split_once('.')
        .ok_or_else(|| format!("filter must look like column.op.value: {}", arg))?;

    if column.is_empty() {
        return Err(format!("filter has no column: {}", arg));
    }

    let (operator, raw_value) = match rest.split_once('.') {
        Some((op, value)) => match FilterOperator::parse(op) {
            Some(op) => (op, value),
            None => {
                tracing::warn!(operator = op, "unrecognized filter operator, using eq");
                (FilterOperator::Eq, rest)
            }
        },
        None => (FilterOperator::Eq, rest),
    };

    Ok(Filter::new(column, operator, parse_filter_value(raw_value)))
}

/// Parse a textual filter value into the closest JSON type
pub fn parse_filter_value(value: &str) -> Value {
    match value {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(value.to_string())
}
