//! # Data Layer Errors
//!
//! One error type for every table, batch, storage and auth operation.

use thiserror::Error;

/// Result type for data layer operations
pub type DataResult<T> = Result<T, DataError>;

/// A single failed row inside a batch operation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub id: i64,
    pub message: String,
}

/// Data layer errors
#[derive(Debug, Clone, Error)]
pub enum DataError {
    // ==================
    // Remote service
    // ==================
    /// The hosted service answered with an error
    #[error("{message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    // ==================
    // Table errors
    // ==================
    /// A targeted update or delete matched no row
    #[error("No row with id {id} in {table}")]
    NotFound { table: String, id: i64 },

    /// One or more rows of a batch failed
    #[error("{}", join_messages(.failures))]
    Batch { failures: Vec<BatchFailure> },

    /// Filter or ordering names a column the table does not have
    #[error("Unknown column {column} for table {table}")]
    UnknownColumn { table: String, column: String },

    /// Page or page size out of range
    #[error("Invalid page request: {0}")]
    InvalidPage(String),

    // ==================
    // Storage errors
    // ==================
    /// No-overwrite upload hit an existing object
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(String),

    // ==================
    // Auth errors
    // ==================
    /// No access token was supplied
    #[error("User not authenticated")]
    NotAuthenticated,

    // ==================
    // Setup / internal
    // ==================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_messages(failures: &[BatchFailure]) -> String {
    failures
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl DataError {
    /// Get the HTTP status code the hosted service would use for this error
    pub fn status_code(&self) -> u16 {
        match self {
            DataError::Remote { status, .. } => *status,
            DataError::Transport(_) => 503,
            DataError::Decode(_) => 502,
            DataError::NotFound { .. } => 404,
            DataError::Batch { .. } => 207,
            DataError::UnknownColumn { .. } => 400,
            DataError::InvalidPage(_) => 400,
            DataError::AlreadyExists(_) => 409,
            DataError::InvalidPath(_) => 400,
            DataError::Io(_) => 500,
            DataError::NotAuthenticated => 401,
            DataError::Config(_) => 500,
            DataError::Internal(_) => 500,
        }
    }

    /// Whether the error came from the hosted service or the network
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DataError::Remote { .. } | DataError::Transport(_) | DataError::Decode(_)
        )
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::Decode(err.to_string())
        } else {
            DataError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io(err.to_string())
    }
}
