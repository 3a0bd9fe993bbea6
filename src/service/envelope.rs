//! # Operation Envelope
//!
//! The `{data, count, error}` shape UI code consumes. Exactly one of `data`
//! and `error` is set; `count` only accompanies paged reads.

use serde::Serialize;

use crate::error::{DataError, DataResult};
use crate::query::Page;

/// Result of one data operation, flattened for serialization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult<T> {
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            count: None,
            error: None,
        }
    }

    pub fn failed(error: &DataError) -> Self {
        Self {
            data: None,
            count: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> OperationResult<Vec<T>> {
    /// Envelope for a paged read: rows in `data`, total in `count`
    pub fn from_page(result: DataResult<Page<T>>) -> Self {
        match result {
            Ok(page) => Self {
                count: Some(page.count),
                data: Some(page.data),
                error: None,
            },
            Err(e) => Self::failed(&e),
        }
    }
}

impl<T> From<DataResult<T>> for OperationResult<T> {
    fn from(result: DataResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(&e),
        }
    }
}
