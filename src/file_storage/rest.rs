//! # Hosted Storage Backend

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::backend::StorageBackend;
use super::object::{validate_location, StoredObject, UploadOptions};
use crate::client::RestClient;
use crate::error::{DataError, DataResult};

/// Storage backend backed by the hosted object API
#[derive(Debug, Clone)]
pub struct RestStorage {
    client: RestClient,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

impl RestStorage {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    fn object_segments<'a>(bucket: &'a str, path: &'a str) -> Vec<&'a str> {
        std::iter::once(bucket).chain(path.split('/')).collect()
    }
}

#[async_trait]
impl StorageBackend for RestStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> DataResult<StoredObject> {
        validate_location(bucket, path)?;

        let url = self.client.storage_url(&Self::object_segments(bucket, path));
        let request = self
            .client
            .request(Method::POST, url)
            .header(CACHE_CONTROL, options.cache_control_header())
            .header(CONTENT_TYPE, options.content_type.as_str())
            .header("x-upsert", if options.upsert { "true" } else { "false" })
            .body(data);

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(DataError::Remote { status: 409, .. }) => {
                return Err(DataError::AlreadyExists(format!("{}/{}", bucket, path)))
            }
            Err(e) => return Err(e),
        };

        let body: UploadResponse = response.json().await?;
        let mut stored = StoredObject::new(bucket, path);
        if let Some(key) = body.key {
            stored.full_path = key;
        }
        Ok(stored)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> DataResult<usize> {
        for path in paths {
            validate_location(bucket, path)?;
        }

        let url = self.client.storage_url(&[bucket]);
        let request = self
            .client
            .request(Method::DELETE, url)
            .json(&json!({ "prefixes": paths }));

        let response = self.client.send(request).await?;
        match response.json::<Value>().await? {
            Value::Array(removed) => Ok(removed.len()),
            _ => Ok(0),
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let mut segments = vec!["public"];
        segments.extend(Self::object_segments(bucket, path));
        self.client.storage_url(&segments).to_string()
    }
}
