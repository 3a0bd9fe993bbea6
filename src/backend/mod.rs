//! # Table Backends
//!
//! The seam between the typed service and a concrete table store. Backends
//! work on untyped JSON rows; typing happens in the service.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DataResult;
use crate::query::{Predicate, SelectQuery};

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Rows returned by a select
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub rows: Vec<Value>,

    /// Exact number of rows matching the predicates, when it was requested
    pub total: Option<usize>,
}

/// Table store operations
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Run a select
    async fn select(&self, query: &SelectQuery) -> DataResult<Selection>;

    /// Insert rows, returning them as stored
    async fn insert(&self, table: &str, rows: Vec<Value>) -> DataResult<Vec<Value>>;

    /// Apply `patch` to every row matching all predicates, returning the updated rows
    async fn update(&self, table: &str, predicates: &[Predicate], patch: Value) -> DataResult<Vec<Value>>;

    /// Remove every row matching all predicates, returning the removed rows
    async fn delete(&self, table: &str, predicates: &[Predicate]) -> DataResult<Vec<Value>>;

    /// Invoke a stored procedure
    async fn rpc(&self, function: &str, args: Value) -> DataResult<Value>;
}
