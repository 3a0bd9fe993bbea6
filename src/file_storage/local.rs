//! # Local Filesystem Backend
//!
//! Objects live at `<root>/<bucket>/<path>`. No-overwrite uploads rely on
//! `create_new`, so two racing uploads of one path cannot both succeed.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::backend::StorageBackend;
use super::object::{validate_location, ObjectMetadata, StoredObject, UploadOptions};
use crate::error::{DataError, DataResult};

/// Local filesystem storage backend
#[derive(Debug)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
    metadata: RwLock<HashMap<String, ObjectMetadata>>,
}

impl LocalStorage {
    /// Create a new local backend serving public URLs under `public_base_url`
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            metadata: RwLock::new(HashMap::new()),
        }
    }

    fn full_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }

    fn key(bucket: &str, path: &str) -> String {
        format!("{}/{}", bucket, path)
    }

    /// Metadata recorded when the object was uploaded
    pub fn metadata(&self, bucket: &str, path: &str) -> Option<ObjectMetadata> {
        self.metadata
            .read()
            .ok()
            .and_then(|m| m.get(&Self::key(bucket, path)).cloned())
    }

    /// Read an object back
    pub async fn read(&self, bucket: &str, path: &str) -> DataResult<Vec<u8>> {
        validate_location(bucket, path)?;
        fs::read(self.full_path(bucket, path)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DataError::Remote {
                    status: 404,
                    code: None,
                    message: format!("Object not found: {}", path),
                }
            } else {
                DataError::Io(e.to_string())
            }
        })
    }
}

/// Write the whole object, removing the file when the write does not complete
async fn write_object<W>(file: &mut W, data: &[u8], full_path: &Path) -> DataResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(data).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(full_path).await {
            tracing::warn!(path = %full_path.display(), error = %cleanup, "failed to remove partial object");
        }
        return Err(DataError::Io(e.to_string()));
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> DataResult<StoredObject> {
        validate_location(bucket, path)?;
        let full_path = self.full_path(bucket, path);

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut open = fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&full_path).await.map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                DataError::AlreadyExists(Self::key(bucket, path))
            } else {
                DataError::Io(e.to_string())
            }
        })?;
        write_object(&mut file, &data, &full_path).await?;

        let metadata = ObjectMetadata::new(&data, options);
        if let Ok(mut entries) = self.metadata.write() {
            entries.insert(Self::key(bucket, path), metadata);
        }

        Ok(StoredObject::new(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> DataResult<usize> {
        let mut removed = 0;
        for path in paths {
            validate_location(bucket, path)?;
            match fs::remove_file(self.full_path(bucket, path)).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(DataError::Io(e.to_string())),
            }
            if let Ok(mut entries) = self.metadata.write() {
                entries.remove(&Self::key(bucket, path));
            }
        }
        Ok(removed)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }
}
