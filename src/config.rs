//! Client Configuration
//!
//! Connection settings for the hosted backend plus the data layer's own
//! knobs. Every field has a default so a partial JSON file is valid.

use std::env;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Project URL of the hosted backend
    #[serde(default = "default_url")]
    pub url: String,

    /// Anonymous API key, sent as `apikey` and bearer token
    #[serde(default)]
    pub anon_key: String,

    /// Max concurrent row updates inside one batch update (default: 8)
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cache lifetime in seconds attached to uploaded files (default: "3600")
    #[serde(default = "default_cache_control")]
    pub cache_control: String,

    /// Bucket used when a caller does not name one
    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    /// Tracing filter directive (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_control() -> String {
    "3600".to_string()
}

fn default_bucket() -> String {
    "dfs-manager-files".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            anon_key: String::new(),
            batch_concurrency: default_batch_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_control: default_cache_control(),
            default_bucket: default_bucket(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given project
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> DataResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DataError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DataError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> DataResult<Self> {
        let defaults = Self::default();
        let config = Self {
            url: first_var(&["SUPABASE_URL", "VITE_SUPABASE_URL"]).unwrap_or(defaults.url),
            anon_key: first_var(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"])
                .unwrap_or(defaults.anon_key),
            batch_concurrency: env_config("DFS_BATCH_CONCURRENCY", defaults.batch_concurrency),
            request_timeout_secs: env_config(
                "DFS_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            cache_control: env_config("DFS_CACHE_CONTROL", defaults.cache_control),
            default_bucket: env_config("DFS_DEFAULT_BUCKET", defaults.default_bucket),
            log_level: env_config("DFS_LOG", defaults.log_level),
            log_format: env_config("DFS_LOG_FORMAT", defaults.log_format),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no request could succeed with
    pub fn validate(&self) -> DataResult<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(DataError::Config(format!(
                "url must be an http(s) URL, got {:?}",
                self.url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(DataError::Config("anon_key is required".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(DataError::Config("batch_concurrency must be >= 1".to_string()));
        }
        Ok(())
    }

    /// `cache-control` header value for uploads
    pub fn cache_control_header(&self) -> String {
        format!("max-age={}", self.cache_control)
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Read and parse an environment variable, keeping `default` when it is
/// missing or malformed
fn env_config<T: Debug + FromStr>(name: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(env::VarError::NotPresent) => return default,
        Err(env::VarError::NotUnicode(..)) => {
            tracing::warn!("Invalid value for {name}, falling back to {default:?}.");
            return default;
        }
    };
    match T::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Invalid value {raw} for {name}, falling back to {default:?}: {e:?}");
            default
        }
    }
}
