//! # In-Memory Table Backend
//!
//! Evaluates the same [`SelectQuery`] the hosted table API would, against rows
//! kept in process memory. Tables are created on first use and ids are
//! assigned from a per-table sequence starting at 1.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::{Selection, TableBackend};
use crate::error::{DataError, DataResult};
use crate::query::{compare_values, FilterOperator, Predicate, SelectQuery};
use crate::schema::ID_COLUMN;

type RpcHandler = Arc<dyn Fn(Value) -> DataResult<Value> + Send + Sync>;

/// Rows of one table
#[derive(Debug, Default, Clone)]
struct TableData {
    rows: BTreeMap<i64, Value>,
    last_id: i64,
}

/// In-memory table store
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, TableData>>,
    functions: RwLock<HashMap<String, RpcHandler>>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stored procedure
    pub fn register_function<F>(&self, name: impl Into<String>, handler: F) -> DataResult<()>
    where
        F: Fn(Value) -> DataResult<Value> + Send + Sync + 'static,
    {
        let mut functions = self
            .functions
            .write()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        functions.insert(name.into(), Arc::new(handler));
        Ok(())
    }

    /// Number of rows currently stored in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map(|d| d.rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Snapshot of one row
    pub fn row(&self, table: &str, id: i64) -> Option<Value> {
        self.tables
            .read()
            .ok()
            .and_then(|t| t.get(table).and_then(|d| d.rows.get(&id).cloned()))
    }

    fn read_table(&self, table: &str) -> DataResult<TableData> {
        let tables = self
            .tables
            .read()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    fn write_table<F, R>(&self, table: &str, f: F) -> DataResult<R>
    where
        F: FnOnce(&mut TableData) -> DataResult<R>,
    {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        let data = tables.entry(table.to_string()).or_default();
        f(data)
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, query: &SelectQuery) -> DataResult<Selection> {
        let data = self.read_table(&query.table)?;
        let matchers = compile(&query.predicates)?;

        let mut rows: Vec<Value> = data
            .rows
            .into_values()
            .filter(|row| matches_all(&matchers, row))
            .collect();

        // Total before pagination
        let total = rows.len();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if let Some(range) = &query.range {
            rows = rows.into_iter().skip(range.from).take(range.size()).collect();
        }

        let rows = project(rows, &query.columns);

        Ok(Selection {
            rows,
            total: query.count.then_some(total),
        })
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> DataResult<Vec<Value>> {
        self.write_table(table, |data| {
            // Validate everything first so a multi-row insert is all-or-nothing
            let mut next_id = data.last_id;
            let mut prepared = Vec::with_capacity(rows.len());
            for row in rows {
                let Value::Object(mut fields) = row else {
                    return Err(bad_request("insert body must be an object"));
                };
                let id = match fields.get(ID_COLUMN).and_then(Value::as_i64) {
                    Some(id) => id,
                    None => {
                        next_id += 1;
                        next_id
                    }
                };
                if data.rows.contains_key(&id) || prepared.iter().any(|(p, _)| *p == id) {
                    return Err(DataError::Remote {
                        status: 409,
                        code: Some("23505".into()),
                        message: format!(
                            "duplicate key value violates unique constraint \"{}_pkey\"",
                            table
                        ),
                    });
                }
                fields.insert(ID_COLUMN.to_string(), Value::from(id));
                next_id = next_id.max(id);
                prepared.push((id, Value::Object(fields)));
            }

            data.last_id = next_id;
            let inserted = prepared.iter().map(|(_, row)| row.clone()).collect();
            data.rows.extend(prepared);
            Ok(inserted)
        })
    }

    async fn update(&self, table: &str, predicates: &[Predicate], patch: Value) -> DataResult<Vec<Value>> {
        let Value::Object(mut changes) = patch else {
            return Err(bad_request("update body must be an object"));
        };
        changes.remove(ID_COLUMN);
        let matchers = compile(predicates)?;

        self.write_table(table, |data| {
            let mut updated = Vec::new();
            for row in data.rows.values_mut() {
                if !matches_all(&matchers, row) {
                    continue;
                }
                if let Value::Object(fields) = row {
                    for (key, value) in &changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            Ok(updated)
        })
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> DataResult<Vec<Value>> {
        let matchers = compile(predicates)?;

        self.write_table(table, |data| {
            let doomed: Vec<i64> = data
                .rows
                .iter()
                .filter(|(_, row)| matches_all(&matchers, row))
                .map(|(id, _)| *id)
                .collect();

            Ok(doomed
                .into_iter()
                .filter_map(|id| data.rows.remove(&id))
                .collect())
        })
    }

    async fn rpc(&self, function: &str, args: Value) -> DataResult<Value> {
        let handler = {
            let functions = self
                .functions
                .read()
                .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
            functions.get(function).cloned()
        };

        match handler {
            Some(handler) => handler(args),
            None => Err(DataError::Remote {
                status: 404,
                code: Some("PGRST202".into()),
                message: format!("Could not find the function public.{}", function),
            }),
        }
    }
}

fn bad_request(message: &str) -> DataError {
    DataError::Remote {
        status: 400,
        code: None,
        message: message.to_string(),
    }
}

/// A predicate ready to evaluate
enum Matcher<'a> {
    Compare(&'a Predicate),
    Pattern { column: &'a str, regex: Regex },
}

fn compile(predicates: &[Predicate]) -> DataResult<Vec<Matcher<'_>>> {
    predicates
        .iter()
        .map(|p| match p.operator {
            FilterOperator::Like | FilterOperator::Ilike => {
                let pattern = p.value.as_str().unwrap_or_default();
                let regex = like_regex(pattern, p.operator == FilterOperator::Ilike)?;
                Ok(Matcher::Pattern {
                    column: &p.column,
                    regex,
                })
            }
            _ => Ok(Matcher::Compare(p)),
        })
        .collect()
}

fn matches_all(matchers: &[Matcher<'_>], row: &Value) -> bool {
    matchers.iter().all(|m| match m {
        Matcher::Compare(p) => matches_comparison(p, row),
        Matcher::Pattern { column, regex } => row
            .get(*column)
            .and_then(Value::as_str)
            .map(|s| regex.is_match(s))
            .unwrap_or(false),
    })
}

/// SQL-style comparison: a missing or null field matches nothing
fn matches_comparison(predicate: &Predicate, row: &Value) -> bool {
    let field = match row.get(&predicate.column) {
        Some(Value::Null) | None => return false,
        Some(v) => v,
    };

    let ordering = || compare_values(Some(field), Some(&predicate.value));
    match predicate.operator {
        FilterOperator::Eq => ordering().is_eq(),
        FilterOperator::Neq => ordering().is_ne(),
        FilterOperator::Gt => ordering().is_gt(),
        FilterOperator::Gte => ordering().is_ge(),
        FilterOperator::Lt => ordering().is_lt(),
        FilterOperator::Lte => ordering().is_le(),
        FilterOperator::In => predicate
            .value
            .as_array()
            .map(|items| items.iter().any(|v| compare_values(Some(field), Some(v)).is_eq()))
            .unwrap_or(false),
        FilterOperator::Like | FilterOperator::Ilike => false,
    }
}

/// Translate a LIKE pattern (`%` any run, `_` one char) into an anchored regex
fn like_regex(pattern: &str, case_insensitive: bool) -> DataResult<Regex> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| DataError::Internal(format!("Bad pattern {}: {}", pattern, e)))
}

/// Keep only the selected columns
fn project(rows: Vec<Value>, columns: &str) -> Vec<Value> {
    if columns.trim() == "*" {
        return rows;
    }

    let wanted: Vec<&str> = columns.split(',').map(str::trim).collect();
    rows.into_iter()
        .map(|row| match row {
            Value::Object(fields) => {
                let kept: Map<String, Value> = fields
                    .into_iter()
                    .filter(|(k, _)| wanted.contains(&k.as_str()))
                    .collect();
                Value::Object(kept)
            }
            other => other,
        })
        .collect()
}
