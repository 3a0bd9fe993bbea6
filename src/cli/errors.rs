//! Failures that stop the CLI before or after an operation runs.
//!
//! A data operation that fails still prints its envelope; the matching
//! [`CliError::OperationFailed`] only decides the exit status.

use thiserror::Error;

use crate::error::DataError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("DFS_CLI_CONFIG_ERROR: {0}")]
    Config(String),

    #[error("DFS_CLI_IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("DFS_CLI_INVALID_INPUT: {0}")]
    InvalidInput(String),

    #[error("DFS_CLI_OPERATION_FAILED: {0}")]
    OperationFailed(String),
}

impl CliError {
    /// Stable code printed ahead of the message
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "DFS_CLI_CONFIG_ERROR",
            CliError::Io(_) => "DFS_CLI_IO_ERROR",
            CliError::InvalidInput(_) => "DFS_CLI_INVALID_INPUT",
            CliError::OperationFailed(_) => "DFS_CLI_OPERATION_FAILED",
        }
    }

    pub fn message(&self) -> String {
        match self {
            CliError::Io(e) => e.to_string(),
            CliError::Config(msg) | CliError::InvalidInput(msg) | CliError::OperationFailed(msg) => {
                msg.clone()
            }
        }
    }

    /// Process exit status: 2 for setup and usage problems, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InvalidInput(_) => 2,
            CliError::Io(_) | CliError::OperationFailed(_) => 1,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InvalidInput(format!("JSON error: {}", e))
    }
}

impl From<DataError> for CliError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Config(msg) => CliError::Config(msg),
            other => CliError::OperationFailed(other.to_string()),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
