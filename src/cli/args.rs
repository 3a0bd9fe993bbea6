//! CLI argument definitions using clap
//!
//! Table commands take the table's wire name, e.g. `products` or
//! `daily_sales_reports_enhanced`. Row data is a JSON argument or, when
//! omitted, a JSON document on stdin.

use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

use crate::query::{parse_filter_arg, Filter, ReadOptions, DEFAULT_PAGE_SIZE};
use crate::schema::TableName;

/// dfs-portal - typed data access for the station management portal
#[derive(Parser, Debug)]
#[command(name = "dfs-portal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file (default: environment variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Paging, ordering and filtering shared by `read` and `search`
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    #[arg(long, default_value = "id")]
    pub order_by: String,

    /// Sort ascending (default: descending)
    #[arg(long)]
    pub ascending: bool,

    /// Filter as column.op.value, e.g. `station.eq.MOBIL` (repeatable)
    #[arg(long = "filter", short = 'f', value_parser = parse_filter_arg)]
    pub filters: Vec<Filter>,

    /// Comma separated column list
    #[arg(long, default_value = "*")]
    pub select: String,
}

impl From<ReadArgs> for ReadOptions {
    fn from(args: ReadArgs) -> Self {
        ReadOptions {
            page: args.page,
            page_size: args.page_size,
            order_by: args.order_by,
            ascending: args.ascending,
            filters: args.filters,
            select: args.select,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one page of rows with the exact total
    Read {
        table: TableName,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Case-insensitive substring search on one column
    Search {
        table: TableName,
        column: String,
        term: String,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Insert one row
    Create {
        table: TableName,
        /// JSON object (default: read from stdin)
        #[arg(long)]
        data: Option<String>,
    },

    /// Update one row by id
    Update {
        table: TableName,
        id: i64,
        /// JSON object with the columns to change (default: stdin)
        #[arg(long)]
        data: Option<String>,
    },

    /// Delete one row by id
    Delete { table: TableName, id: i64 },

    /// Insert many rows in one call
    BatchCreate {
        table: TableName,
        /// JSON array of row objects (default: stdin)
        #[arg(long)]
        data: Option<String>,
    },

    /// Update many rows; each element carries its `id`
    BatchUpdate {
        table: TableName,
        /// JSON array of objects with an `id` plus changed columns (default: stdin)
        #[arg(long)]
        data: Option<String>,
    },

    /// Delete every row with one of the given ids
    BatchDelete {
        table: TableName,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },

    /// Call a stored procedure
    Rpc {
        function: String,
        /// JSON object of named arguments
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Upload a local file without overwriting
    Upload {
        file: PathBuf,
        /// Object path inside the bucket (default: the file name)
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Print the public URL of an object
    Url {
        path: String,
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Remove objects from a bucket
    Rm {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Check that the backend answers
    Ping {
        #[arg(default_value = "stations")]
        table: TableName,
    },

    /// Show the signed-in account and its portal role
    Whoami {
        /// Access token issued at sign-in
        #[arg(long, value_parser = parse_secret)]
        token: Secret,
    },

    /// Create an account
    Register {
        email: String,
        #[arg(long, value_parser = parse_secret)]
        password: Secret,
    },
}

/// Argument value kept out of debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

fn parse_secret(value: &str) -> Result<Secret, String> {
    if value.is_empty() {
        return Err("value is empty".to_string());
    }
    Ok(Secret(value.to_string()))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterOperator;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_read() {
        let cli = Cli::try_parse_from([
            "dfs-portal",
            "read",
            "products",
            "--page",
            "2",
            "--page-size",
            "5",
            "--order-by",
            "price",
            "--ascending",
            "-f",
            "category.eq.Snacks",
        ])
        .unwrap();

        match cli.command {
            Command::Read { table, read } => {
                assert_eq!(table, TableName::Products);
                let options = ReadOptions::from(read);
                assert_eq!(options.page, 2);
                assert_eq!(options.page_size, 5);
                assert!(options.ascending);
                assert_eq!(options.filters.len(), 1);
                assert_eq!(options.filters[0].operator, FilterOperator::Eq);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table_rejected() {
        assert!(Cli::try_parse_from(["dfs-portal", "read", "sales"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["dfs-portal", "delete", "stations", "4", "--config", "portal.json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("portal.json")));
        assert!(matches!(cli.command, Command::Delete { id: 4, .. }));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let cli = Cli::try_parse_from([
            "dfs-portal",
            "register",
            "ana@example.com",
            "--password",
            "hunter22",
        ])
        .unwrap();

        assert!(!format!("{:?}", cli.command).contains("hunter22"));
        match cli.command {
            Command::Register { email, password } => {
                assert_eq!(email, "ana@example.com");
                assert_eq!(password.expose(), "hunter22");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from(["dfs-portal", "whoami", "--token", ""]).is_err());
    }
}
