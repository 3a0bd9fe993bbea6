//! # Query Building
//!
//! Filter descriptors, pagination and the select builder shared by every
//! table backend.

pub mod filter;
pub mod page;
pub mod predicate;
pub mod select;

pub use filter::{parse_filter_arg, Filter, FilterOperator};
pub use page::{Page, PageRequest, RowRange, DEFAULT_PAGE_SIZE};
pub use predicate::{compare_values, Predicate};
pub use select::{predicate_pairs, Order, ReadOptions, SelectQuery};
