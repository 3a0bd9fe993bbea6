//! CLI module for dfs-portal
//!
//! Runs one data operation per invocation and prints its result envelope:
//! - read / search: paged reads with filters
//! - create / update / delete: single rows
//! - batch-create / batch-update / batch-delete: many rows
//! - rpc: stored procedures
//! - upload / url / rm: files
//! - ping: connectivity check
//! - whoami / register: accounts

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ReadArgs, Secret};
pub use commands::{execute, load_config, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{parse_input, read_input, write_json, write_response};
