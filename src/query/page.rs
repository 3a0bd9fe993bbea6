//! # Pagination
//!
//! Pages are 1-based; the row window they select is 0-based and inclusive.

use serde::Serialize;

use crate::error::{DataError, DataResult};

/// Default page size for reads
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
    window: RowRange,
}

impl PageRequest {
    /// Create a page request. Both values must be at least 1 and the row
    /// window they describe must fit in a `usize`.
    pub fn new(page: usize, page_size: usize) -> DataResult<Self> {
        if page == 0 {
            return Err(DataError::InvalidPage("page must be >= 1".to_string()));
        }
        if page_size == 0 {
            return Err(DataError::InvalidPage("page size must be >= 1".to_string()));
        }
        let window = (page - 1)
            .checked_mul(page_size)
            .and_then(|from| from.checked_add(page_size - 1).map(|to| RowRange { from, to }))
            .ok_or_else(|| {
                DataError::InvalidPage(format!("page {} of size {} overflows the row window", page, page_size))
            })?;
        Ok(Self {
            page,
            page_size,
            window,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Row window covered by this page
    pub fn range(&self) -> RowRange {
        self.window
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            window: RowRange {
                from: 0,
                to: DEFAULT_PAGE_SIZE - 1,
            },
        }
    }
}

/// Inclusive, zero-indexed row window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: usize,
    pub to: usize,
}

impl RowRange {
    /// Number of rows the window can hold
    pub fn size(&self) -> usize {
        self.to - self.from + 1
    }
}

/// One page of rows plus the exact total matching the filters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, count: usize) -> Self {
        Self { data, count }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
