//! # Select Builder
//!
//! Compiles caller-facing [`ReadOptions`] into a backend-neutral
//! [`SelectQuery`]: filters in input order, one ordering key, then an
//! inclusive row window.

use serde::{Deserialize, Serialize};

use super::filter::Filter;
use super::page::{PageRequest, RowRange, DEFAULT_PAGE_SIZE};
use super::predicate::Predicate;
use crate::error::{DataError, DataResult};
use crate::schema::{Table, ID_COLUMN};

/// Options of a paginated read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// 1-based page number
    pub page: usize,

    pub page_size: usize,

    /// Single ordering column
    pub order_by: String,

    pub ascending: bool,

    /// Conjunctive filters, applied in order
    pub filters: Vec<Filter>,

    /// Column list, `*` for all
    pub select: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: ID_COLUMN.to_string(),
            ascending: false,
            filters: Vec::new(),
            select: "*".to_string(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = column.into();
        self.ascending = ascending;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }
}

/// Order clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A fully built select against one table
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub predicates: Vec<Predicate>,
    pub order: Option<Order>,
    pub range: Option<RowRange>,

    /// Ask for the exact number of matching rows
    pub count: bool,
}

impl SelectQuery {
    /// Unfiltered, unordered, unbounded select of every column
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            predicates: Vec::new(),
            order: None,
            range: None,
            count: false,
        }
    }

    /// Build the paginated, exactly counted select described by `options`.
    ///
    /// Filter and order columns must belong to `T`.
    pub fn compile<T: Table>(options: &ReadOptions) -> DataResult<Self> {
        let page = PageRequest::new(options.page, options.page_size)?;

        let mut query = Self::new(T::NAME);
        query.columns = normalize_select(&options.select);

        for filter in &options.filters {
            check_column::<T>(&filter.column)?;
            query = query.narrow(Predicate::from(filter));
        }

        check_column::<T>(&options.order_by)?;
        query.order = Some(Order {
            column: options.order_by.clone(),
            ascending: options.ascending,
        });
        query.range = Some(page.range());
        query.count = true;

        Ok(query)
    }

    /// Add a predicate
    pub fn narrow(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Render table API query parameters, in a stable order
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];

        pairs.extend(predicate_pairs(&self.predicates));

        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(range) = &self.range {
            pairs.push(("offset".to_string(), range.from.to_string()));
            pairs.push(("limit".to_string(), range.size().to_string()));
        }

        pairs
    }
}

/// Render `<column>=<op>.<value>` pairs
pub fn predicate_pairs(predicates: &[Predicate]) -> Vec<(String, String)> {
    predicates
        .iter()
        .map(|p| (p.column.clone(), p.render()))
        .collect()
}

fn check_column<T: Table>(column: &str) -> DataResult<()> {
    if T::has_column(column) {
        Ok(())
    } else {
        Err(DataError::UnknownColumn {
            table: T::NAME.to_string(),
            column: column.to_string(),
        })
    }
}

fn normalize_select(select: &str) -> String {
    let columns: Vec<&str> = select
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(",")
    }
}
