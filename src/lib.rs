//! dfs-portal - typed data access for a gas-station management portal
//!
//! Table reads and writes, batch operations, file storage and accounts
//! against a hosted PostgREST-style backend, behind one [`DataService`].

pub mod auth;
pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod file_storage;
pub mod observability;
pub mod query;
pub mod schema;
pub mod service;

pub use auth::{AuthBackend, MemoryAuth, RestAuth};
pub use backend::{MemoryBackend, RestBackend, TableBackend};
pub use client::RestClient;
pub use config::ClientConfig;
pub use error::{BatchFailure, DataError, DataResult};
pub use file_storage::{LocalStorage, RestStorage, StorageBackend};
pub use query::{Filter, FilterOperator, Page, ReadOptions};
pub use schema::{Table, TableName};
pub use service::{DataService, OperationResult, ServiceOptions};
