//! # Compiled Predicates
//!
//! The backend-facing form of a filter: pattern operators already carry their
//! `%` wildcards, and `in` lists are arrays.

use std::cmp::Ordering;

use serde_json::Value;

use super::filter::{Filter, FilterOperator};

/// One condition of a select, update or delete
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    /// Equality predicate
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOperator::Eq, value.into())
    }

    /// Membership predicate
    pub fn in_list<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(
            column,
            FilterOperator::In,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Render the `<op>.<value>` half of a query parameter
    pub fn render(&self) -> String {
        match (&self.operator, &self.value) {
            (FilterOperator::In, Value::Array(items)) => {
                let items: Vec<String> = items.iter().map(render_list_item).collect();
                format!("in.({})", items.join(","))
            }
            (op, value) => format!("{}.{}", op.as_str(), render_scalar(value)),
        }
    }
}

impl From<&Filter> for Predicate {
    fn from(filter: &Filter) -> Self {
        let value = if filter.operator.is_pattern() {
            Value::String(format!("%{}%", render_scalar(&filter.value)))
        } else {
            filter.value.clone()
        };
        Self::new(filter.column.clone(), filter.operator, value)
    }
}

/// Render a scalar the way the table API expects it in a query string
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// List items containing reserved characters are double-quoted
fn render_list_item(value: &Value) -> String {
    let raw = render_scalar(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}

/// Compare two JSON values for filtering and sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string
/// - a numeric string compares numerically against a number
/// - arrays and objects compare equal
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => cmp_f64(x.as_f64(), y.as_f64()),
            (Value::Number(x), Value::String(s)) => match s.parse::<f64>() {
                Ok(y) => cmp_f64(x.as_f64(), Some(y)),
                Err(_) => type_rank(a).cmp(&type_rank(b)),
            },
            (Value::String(s), Value::Number(y)) => match s.parse::<f64>() {
                Ok(x) => cmp_f64(Some(x), y.as_f64()),
                Err(_) => type_rank(a).cmp(&type_rank(b)),
            },
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Null, Value::Null) => Ordering::Equal,
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(0.0)
        .partial_cmp(&b.unwrap_or(0.0))
        .unwrap_or(Ordering::Equal)
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
