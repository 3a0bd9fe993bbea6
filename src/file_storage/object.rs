//! # Stored Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DataError, DataResult};

/// Upload settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Cache lifetime in seconds
    pub cache_control: String,

    /// Replace an existing object instead of failing
    pub upsert: bool,

    pub content_type: String,
}

impl UploadOptions {
    /// No-overwrite upload with the given cache lifetime
    pub fn new(cache_control: impl Into<String>, path: &str) -> Self {
        Self {
            cache_control: cache_control.into(),
            upsert: false,
            content_type: guess_content_type(path).to_string(),
        }
    }

    /// `cache-control` header value
    pub fn cache_control_header(&self) -> String {
        format!("max-age={}", self.cache_control)
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Path inside the bucket
    pub path: String,

    /// `<bucket>/<path>`
    pub full_path: String,
}

impl StoredObject {
    pub fn new(bucket: &str, path: &str) -> Self {
        Self {
            path: path.to_string(),
            full_path: format!("{}/{}", bucket, path),
        }
    }
}

/// What a store remembers about an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: String,
    pub cache_control: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl ObjectMetadata {
    pub fn new(data: &[u8], options: &UploadOptions) -> Self {
        Self {
            size: data.len() as u64,
            content_type: options.content_type.clone(),
            cache_control: options.cache_control_header(),
            checksum: calculate_checksum(data),
            created_at: Utc::now(),
        }
    }
}

/// SHA-256 of the object body, hex encoded
pub fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Reject names that could escape the bucket
pub fn validate_name(kind: &str, name: &str) -> DataResult<()> {
    if name.is_empty() {
        return Err(DataError::InvalidPath(format!("{} is empty", kind)));
    }
    if name.starts_with('/') || name.contains('\\') {
        return Err(DataError::InvalidPath(format!("{} {:?} must be relative", kind, name)));
    }
    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(DataError::InvalidPath(format!(
            "{} {:?} has an empty or dot segment",
            kind, name
        )));
    }
    Ok(())
}

/// Validate a bucket name and an object path together
pub fn validate_location(bucket: &str, path: &str) -> DataResult<()> {
    validate_name("bucket", bucket)?;
    if bucket.contains('/') {
        return Err(DataError::InvalidPath(format!("bucket {:?} contains '/'", bucket)));
    }
    validate_name("path", path)
}

/// Content type from the file extension
pub fn guess_content_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "json" => "application/json",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
