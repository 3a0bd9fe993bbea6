//! CLI command implementations
//!
//! Commands are thin: parse input, call one [`DataService`] operation, wrap
//! the outcome in an [`OperationResult`] envelope. Operation failures live in
//! the envelope; only bad input or setup problems are [`CliError`]s.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::{AuthBackend, Credentials, RestAuth};
use crate::backend::TableBackend;
use crate::client::RestClient;
use crate::config::ClientConfig;
use crate::error::DataResult;
use crate::file_storage::StorageBackend;
use crate::observability::{init_logging, LogFormat};
use crate::query::{Page, ReadOptions};
use crate::schema::{
    AuditLogs, DailySalesReports, DeliveryRecords, Employees, Products, Stations, Table, TableName,
    UserProfiles, ID_COLUMN,
};
use crate::service::{DataService, OperationResult};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_response};

/// Run `$body` with `$t` bound to the marker type of `$table`
macro_rules! with_table {
    ($table:expr, $t:ident => $body:expr) => {
        match $table {
            TableName::DeliveryRecords => {
                type $t = DeliveryRecords;
                $body
            }
            TableName::Stations => {
                type $t = Stations;
                $body
            }
            TableName::Products => {
                type $t = Products;
                $body
            }
            TableName::Employees => {
                type $t = Employees;
                $body
            }
            TableName::DailySalesReports => {
                type $t = DailySalesReports;
                $body
            }
            TableName::AuditLogs => {
                type $t = AuditLogs;
                $body
            }
            TableName::UserProfiles => {
                type $t = UserProfiles;
                $body
            }
        }
    };
}

/// Load configuration from `path`, or from the environment when absent
pub fn load_config(path: Option<&Path>) -> CliResult<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::from_env()?,
    };
    Ok(config)
}

/// Parse arguments, run one command, print its envelope
pub async fn run() -> CliResult<()> {
    run_command(Cli::parse_args()).await
}

/// Run an already parsed command line against the hosted backend
pub async fn run_command(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(&config.log_level, format)?;

    let service = DataService::connect(&config)?;
    let auth = RestAuth::new(RestClient::new(&config)?);
    let envelope = execute(&service, &auth, &config.default_bucket, cli.command).await?;
    write_response(&envelope)?;

    match envelope.error {
        None => Ok(()),
        Some(message) => Err(CliError::OperationFailed(message)),
    }
}

/// Execute one command against any service
pub async fn execute<B, S, A>(
    service: &DataService<B, S>,
    auth: &A,
    default_bucket: &str,
    command: Command,
) -> CliResult<OperationResult<Value>>
where
    B: TableBackend,
    S: StorageBackend,
    A: AuthBackend,
{
    debug!(command = ?command, "executing");

    match command {
        Command::Read { table, read } => {
            let options = ReadOptions::from(read);
            with_table!(table, T => page_envelope(service.read::<T>(&options).await))
        }
        Command::Search {
            table,
            column,
            term,
            read,
        } => {
            let options = ReadOptions::from(read);
            with_table!(table, T => page_envelope(service.search::<T>(&column, &term, &options).await))
        }
        Command::Create { table, data } => {
            let input = read_input(data.as_deref())?;
            with_table!(table, T => create::<T, _, _>(service, input).await)
        }
        Command::Update { table, id, data } => {
            let input = read_input(data.as_deref())?;
            with_table!(table, T => update::<T, _, _>(service, id, input).await)
        }
        Command::Delete { table, id } => {
            with_table!(table, T => envelope(service.delete::<T>(id).await))
        }
        Command::BatchCreate { table, data } => {
            let input = read_input(data.as_deref())?;
            with_table!(table, T => batch_create::<T, _, _>(service, input).await)
        }
        Command::BatchUpdate { table, data } => {
            let input = read_input(data.as_deref())?;
            with_table!(table, T => batch_update::<T, _, _>(service, input).await)
        }
        Command::BatchDelete { table, ids } => {
            with_table!(table, T => envelope(service.batch_delete::<T>(&ids).await))
        }
        Command::Rpc { function, args } => {
            let args = read_input(Some(args.as_str()))?;
            envelope(service.rpc(&function, args).await)
        }
        Command::Upload { file, path, bucket } => {
            let path = match path {
                Some(path) => path,
                None => file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        CliError::InvalidInput(format!("no file name in {}", file.display()))
                    })?,
            };
            let data = tokio::fs::read(&file).await?;
            let bucket = bucket.as_deref().unwrap_or(default_bucket);
            envelope(service.upload_file(bucket, &path, data).await)
        }
        Command::Url { path, bucket } => {
            let bucket = bucket.as_deref().unwrap_or(default_bucket);
            envelope(Ok(service.file_url(bucket, &path)))
        }
        Command::Rm { paths, bucket } => {
            let bucket = bucket.as_deref().unwrap_or(default_bucket);
            envelope(service.delete_files(bucket, &paths).await)
        }
        Command::Ping { table } => {
            with_table!(table, T => envelope(service.ping::<T>().await))
        }
        Command::Whoami { token } => envelope(service.current_user(auth, token.expose()).await),
        Command::Register { email, password } => {
            let credentials = Credentials::new(email, password.expose());
            envelope(service.register(auth, &credentials).await)
        }
    }
}

async fn create<T, B, S>(service: &DataService<B, S>, input: Value) -> CliResult<OperationResult<Value>>
where
    T: Table,
    B: TableBackend,
    S: StorageBackend,
{
    let row: T::Patch = serde_json::from_value(input)?;
    envelope(service.create::<T>(&row).await)
}

async fn update<T, B, S>(
    service: &DataService<B, S>,
    id: i64,
    input: Value,
) -> CliResult<OperationResult<Value>>
where
    T: Table,
    B: TableBackend,
    S: StorageBackend,
{
    let patch: T::Patch = serde_json::from_value(input)?;
    envelope(service.update::<T>(id, &patch).await)
}

async fn batch_create<T, B, S>(
    service: &DataService<B, S>,
    input: Value,
) -> CliResult<OperationResult<Value>>
where
    T: Table,
    B: TableBackend,
    S: StorageBackend,
{
    let rows: Vec<T::Insert> = serde_json::from_value(input)?;
    envelope(service.batch_create::<T>(&rows).await)
}

async fn batch_update<T, B, S>(
    service: &DataService<B, S>,
    input: Value,
) -> CliResult<OperationResult<Value>>
where
    T: Table,
    B: TableBackend,
    S: StorageBackend,
{
    let updates = split_updates::<T>(input)?;
    envelope(service.batch_update::<T>(&updates).await)
}

/// Split `[{id, ...changes}]` into `(id, patch)` pairs
fn split_updates<T: Table>(input: Value) -> CliResult<Vec<(i64, T::Patch)>> {
    let Value::Array(items) = input else {
        return Err(CliError::InvalidInput("batch update expects a JSON array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let Value::Object(mut fields) = item else {
                return Err(CliError::InvalidInput(format!(
                    "batch update element {} is not an object",
                    index
                )));
            };
            let id = fields
                .remove(ID_COLUMN)
                .and_then(|id| id.as_i64())
                .ok_or_else(|| {
                    CliError::InvalidInput(format!("batch update element {} has no integer id", index))
                })?;
            let patch: T::Patch = serde_json::from_value(Value::Object(fields))?;
            Ok((id, patch))
        })
        .collect()
}

fn envelope<T: Serialize>(result: DataResult<T>) -> CliResult<OperationResult<Value>> {
    Ok(match result {
        Ok(data) => OperationResult::ok(serde_json::to_value(data)?),
        Err(e) => OperationResult::failed(&e),
    })
}

fn page_envelope<T: Serialize>(result: DataResult<Page<T>>) -> CliResult<OperationResult<Value>> {
    let page = OperationResult::from_page(result);
    Ok(OperationResult {
        data: page.data.map(serde_json::to_value).transpose()?,
        count: page.count,
        error: page.error,
    })
}
