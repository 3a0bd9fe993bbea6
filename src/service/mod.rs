//! # Data Service
//!
//! The single entry point UI code talks to: typed table operations, batch
//! operations and file helpers over one table backend and one storage
//! backend, both injected at construction. Account calls take their auth
//! backend per call.
//!
//! Every operation returns [`DataResult`]. Failures are logged here before
//! they are handed back; nothing is retried.

pub mod envelope;

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::auth::{AuthBackend, Credentials, CurrentUser, Registration};
use crate::backend::{RestBackend, TableBackend};
use crate::client::RestClient;
use crate::config::ClientConfig;
use crate::error::{BatchFailure, DataError, DataResult};
use crate::file_storage::{RestStorage, StorageBackend, StoredObject, UploadOptions};
use crate::query::{Filter, Page, Predicate, ReadOptions, SelectQuery};
use crate::schema::{Table, UserProfiles, ID_COLUMN};

pub use envelope::OperationResult;

/// Service tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Max row updates in flight during a batch update
    pub batch_concurrency: usize,

    /// Cache lifetime in seconds for uploads
    pub cache_control: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        let config = ClientConfig::default();
        Self::from(&config)
    }
}

impl From<&ClientConfig> for ServiceOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            batch_concurrency: config.batch_concurrency.max(1),
            cache_control: config.cache_control.clone(),
        }
    }
}

/// Typed data access over injected backends
#[derive(Debug)]
pub struct DataService<B, S> {
    tables: B,
    files: S,
    options: ServiceOptions,
}

impl DataService<RestBackend, RestStorage> {
    /// Service talking to the hosted project described by `config`
    pub fn connect(config: &ClientConfig) -> DataResult<Self> {
        let client = RestClient::new(config)?;
        Ok(Self::new(
            RestBackend::new(client.clone()),
            RestStorage::new(client),
            ServiceOptions::from(config),
        ))
    }
}

impl<B: TableBackend, S: StorageBackend> DataService<B, S> {
    pub fn new(tables: B, files: S, options: ServiceOptions) -> Self {
        Self {
            tables,
            files,
            options,
        }
    }

    pub fn tables(&self) -> &B {
        &self.tables
    }

    pub fn files(&self) -> &S {
        &self.files
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    // ==================
    // Table access
    // ==================

    /// Insert one row, returning it with its assigned id
    pub async fn create<T: Table>(&self, row: &T::Patch) -> DataResult<T::Row> {
        self.insert_row::<T>(row)
            .await
            .inspect_err(|e| error!(table = T::NAME, error = %e, "create failed"))
    }

    /// One page of rows plus the exact number of matching rows
    pub async fn read<T: Table>(&self, options: &ReadOptions) -> DataResult<Page<T::Row>> {
        self.select_page::<T>(options)
            .await
            .inspect_err(|e| error!(table = T::NAME, error = %e, "read failed"))
    }

    /// `read` narrowed by a case-insensitive substring match on `column`
    pub async fn search<T: Table>(
        &self,
        column: &str,
        term: &str,
        options: &ReadOptions,
    ) -> DataResult<Page<T::Row>> {
        let options = options.clone().filter(Filter::ilike(column, term));
        self.read::<T>(&options).await
    }

    /// Update the row with `id`; a missing row is [`DataError::NotFound`]
    pub async fn update<T: Table>(&self, id: i64, patch: &T::Patch) -> DataResult<T::Row> {
        self.update_row::<T>(id, patch)
            .await
            .inspect_err(|e| error!(table = T::NAME, id, error = %e, "update failed"))
    }

    /// Delete the row with `id`; a missing row is [`DataError::NotFound`]
    pub async fn delete<T: Table>(&self, id: i64) -> DataResult<()> {
        self.delete_row::<T>(id)
            .await
            .inspect_err(|e| error!(table = T::NAME, id, error = %e, "delete failed"))
    }

    /// Invoke a stored procedure
    pub async fn rpc(&self, function: &str, args: Value) -> DataResult<Value> {
        self.tables
            .rpc(function, args)
            .await
            .inspect_err(|e| error!(function, error = %e, "rpc failed"))
    }

    /// Cheapest possible round trip against `T`
    pub async fn ping<T: Table>(&self) -> DataResult<()> {
        let options = ReadOptions::new().page(1, 1).select(ID_COLUMN);
        self.read::<T>(&options).await.map(|_| ())
    }

    // ==================
    // Batch operations
    // ==================

    /// Insert many rows in one call. Atomicity is the backing store's.
    pub async fn batch_create<T: Table>(&self, rows: &[T::Insert]) -> DataResult<Vec<T::Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        self.insert_rows::<T>(rows).await.inspect_err(|e| {
            error!(table = T::NAME, rows = rows.len(), error = %e, "batch create failed")
        })
    }

    /// Update many rows, each independently.
    ///
    /// Not atomic: at most `batch_concurrency` updates run at once, every
    /// update is awaited, and if any failed the whole call fails with the
    /// joined messages even though the other rows stay updated.
    pub async fn batch_update<T: Table>(&self, updates: &[(i64, T::Patch)]) -> DataResult<Vec<T::Row>> {
        let results: Vec<(i64, DataResult<T::Row>)> = stream::iter(updates)
            .map(|(id, patch)| async move { (*id, self.update::<T>(*id, patch).await) })
            .buffered(self.options.batch_concurrency.max(1))
            .collect()
            .await;

        let mut rows = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => failures.push(BatchFailure {
                    id,
                    message: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(rows)
        } else {
            let err = DataError::Batch { failures };
            error!(
                table = T::NAME,
                rows = updates.len(),
                error = %err,
                "batch update partially failed"
            );
            Err(err)
        }
    }

    /// Delete every row whose id is in `ids`, returning how many were removed
    pub async fn batch_delete<T: Table>(&self, ids: &[i64]) -> DataResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.tables
            .delete(T::NAME, &[Predicate::in_list(ID_COLUMN, ids.iter().copied())])
            .await
            .map(|removed| removed.len())
            .inspect_err(|e| {
                error!(table = T::NAME, rows = ids.len(), error = %e, "batch delete failed")
            })
    }

    // ==================
    // Files
    // ==================

    /// Upload without overwriting, with the configured cache lifetime
    pub async fn upload_file(&self, bucket: &str, path: &str, data: Vec<u8>) -> DataResult<StoredObject> {
        let options = UploadOptions::new(self.options.cache_control.clone(), path);
        self.files
            .upload(bucket, path, data, &options)
            .await
            .inspect_err(|e| error!(bucket, path, error = %e, "upload failed"))
    }

    /// Public URL of an object, whether or not it exists
    pub fn file_url(&self, bucket: &str, path: &str) -> String {
        self.files.public_url(bucket, path)
    }

    /// Remove objects, returning how many existed
    pub async fn delete_files(&self, bucket: &str, paths: &[String]) -> DataResult<usize> {
        self.files
            .remove(bucket, paths)
            .await
            .inspect_err(|e| error!(bucket, files = paths.len(), error = %e, "file delete failed"))
    }

    // ==================
    // Accounts
    // ==================

    /// The account behind `access_token`, with the role from its profile row.
    ///
    /// A missing or unreadable profile is not an error: the account gets the
    /// default role.
    pub async fn current_user<A: AuthBackend>(&self, auth: &A, access_token: &str) -> DataResult<CurrentUser> {
        self.resolve_user(auth, access_token)
            .await
            .inspect_err(|e| error!(error = %e, "current user lookup failed"))
    }

    /// Create an account
    pub async fn register<A: AuthBackend>(&self, auth: &A, credentials: &Credentials) -> DataResult<Registration> {
        auth.sign_up(credentials)
            .await
            .inspect_err(|e| error!(email = %credentials.email, error = %e, "registration failed"))
    }

    // ==================
    // Single round trips
    // ==================

    async fn resolve_user<A: AuthBackend>(&self, auth: &A, access_token: &str) -> DataResult<CurrentUser> {
        if access_token.trim().is_empty() {
            return Err(DataError::NotAuthenticated);
        }
        let user = auth.user(access_token).await?;

        let options = ReadOptions::new()
            .page(1, 1)
            .filter(Filter::eq("user_id", user.id.clone()));
        let profile = match self.select_page::<UserProfiles>(&options).await {
            Ok(page) => page.data.into_iter().next(),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "profile lookup failed, using default role");
                None
            }
        };
        Ok(CurrentUser::new(user, profile))
    }

    async fn insert_row<T: Table>(&self, row: &T::Patch) -> DataResult<T::Row> {
        let body = serde_json::to_value(row)?;
        let stored = self.tables.insert(T::NAME, vec![body]).await?;
        first_row::<T>(stored)
    }

    async fn insert_rows<T: Table>(&self, rows: &[T::Insert]) -> DataResult<Vec<T::Row>> {
        let body = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let stored = self.tables.insert(T::NAME, body).await?;
        decode_rows::<T>(stored)
    }

    async fn select_page<T: Table>(&self, options: &ReadOptions) -> DataResult<Page<T::Row>> {
        let query = SelectQuery::compile::<T>(options)?;
        debug!(table = T::NAME, filters = query.predicates.len(), "read");

        let selection = self.tables.select(&query).await?;
        let count = selection
            .total
            .ok_or_else(|| DataError::Decode("response carried no exact count".to_string()))?;
        Ok(Page::new(decode_rows::<T>(selection.rows)?, count))
    }

    async fn update_row<T: Table>(&self, id: i64, patch: &T::Patch) -> DataResult<T::Row> {
        let body = serde_json::to_value(patch)?;
        let updated = self
            .tables
            .update(T::NAME, &[Predicate::eq(ID_COLUMN, id)], body)
            .await?;
        if updated.is_empty() {
            return Err(not_found::<T>(id));
        }
        first_row::<T>(updated)
    }

    async fn delete_row<T: Table>(&self, id: i64) -> DataResult<()> {
        let removed = self
            .tables
            .delete(T::NAME, &[Predicate::eq(ID_COLUMN, id)])
            .await?;
        if removed.is_empty() {
            return Err(not_found::<T>(id));
        }
        Ok(())
    }
}

fn not_found<T: Table>(id: i64) -> DataError {
    DataError::NotFound {
        table: T::NAME.to_string(),
        id,
    }
}

fn decode_rows<T: Table>(rows: Vec<Value>) -> DataResult<Vec<T::Row>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DataError::from))
        .collect()
}

fn first_row<T: Table>(rows: Vec<Value>) -> DataResult<T::Row> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Decode(format!("{} returned no row", T::NAME)))?;
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::file_storage::LocalStorage;
    use crate::schema::{ProductPatch, Products, StationPatch, Stations};
    use tempfile::TempDir;

    fn service() -> (DataService<MemoryBackend, LocalStorage>, TempDir) {
        let temp = TempDir::new().unwrap();
        let files = LocalStorage::new(temp.path().to_path_buf(), "http://files.local");
        (
            DataService::new(MemoryBackend::new(), files, ServiceOptions::default()),
            temp,
        )
    }

    fn station(name: &str) -> StationPatch {
        StationPatch {
            station_name: Some(name.to_string()),
            status: Some("Active".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_returns_assigned_id() {
        let (service, _temp) = service();
        let row = service.create::<Stations>(&station("MOBIL")).await.unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.station_name, "MOBIL");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let (service, _temp) = service();
        let result = service.update::<Stations>(42, &station("X")).await;
        assert!(matches!(result, Err(DataError::NotFound { id: 42, .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_not_found() {
        let (service, _temp) = service();
        let result = service.delete::<Products>(7).await;
        assert!(matches!(result, Err(DataError::NotFound { id: 7, .. })));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (service, _temp) = service();
        for name in ["Coca Cola 20oz", "Pepsi 20oz", "COLA Zero"] {
            let patch = ProductPatch {
                product_name: Some(name.to_string()),
                ..Default::default()
            };
            service.create::<Products>(&patch).await.unwrap();
        }

        let page = service
            .search::<Products>("product_name", "cola", &ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(page.count, 2);
    }

    #[tokio::test]
    async fn test_empty_batches_skip_the_backend() {
        let (service, _temp) = service();
        assert!(service.batch_create::<Products>(&[]).await.unwrap().is_empty());
        assert_eq!(service.batch_delete::<Products>(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let (service, _temp) = service();
        assert!(service.ping::<Stations>().await.is_ok());
    }
}
