//! # Storage Backend Trait

use async_trait::async_trait;

use super::object::{StoredObject, UploadOptions};
use crate::error::DataResult;

/// Backend trait for file storage
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` at `bucket/path`
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> DataResult<StoredObject>;

    /// Remove objects, returning how many existed
    async fn remove(&self, bucket: &str, paths: &[String]) -> DataResult<usize>;

    /// Public URL of an object. Does not check that it exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
