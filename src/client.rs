//! HTTP client for the hosted backend.
//!
//! Holds the project URL, API key and a pooled `reqwest::Client`. Cloning is
//! cheap; the table backend and the object store share one instance.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{DataError, DataResult};

const REST_PREFIX: [&str; 2] = ["rest", "v1"];
const STORAGE_PREFIX: [&str; 3] = ["storage", "v1", "object"];
const AUTH_PREFIX: [&str; 2] = ["auth", "v1"];

/// Connection to one hosted project
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

/// Error body shared by the table, storage and auth APIs
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
    #[serde(rename = "statusCode")]
    status_code: Option<serde_json::Value>,
}

impl RestClient {
    /// Build a client from validated configuration
    pub fn new(config: &ClientConfig) -> DataResult<Self> {
        config.validate()?;

        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| DataError::Config(format!("Invalid url {}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DataError::Config(format!("Invalid url {}", config.url)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DataError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: config.anon_key.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/rest/v1/<segments...>`
    pub fn rest_url(&self, segments: &[&str]) -> Url {
        self.url_with(&REST_PREFIX, segments)
    }

    /// `<base>/storage/v1/object/<segments...>`
    pub fn storage_url(&self, segments: &[&str]) -> Url {
        self.url_with(&STORAGE_PREFIX, segments)
    }

    /// `<base>/auth/v1/<segments...>`
    pub fn auth_url(&self, segments: &[&str]) -> Url {
        self.url_with(&AUTH_PREFIX, segments)
    }

    fn url_with(&self, prefix: &[&str], segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in new(): the base can hold path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(prefix).extend(segments);
        }
        url
    }

    /// Start a request authorized by the project API key
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, &self.api_key)
    }

    /// Start a request on behalf of a signed-in user
    pub fn request_as(&self, method: Method, url: Url, access_token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
    }

    /// Send a request, turning non-success statuses into [`DataError::Remote`]
    pub async fn send(&self, request: RequestBuilder) -> DataResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// Decode an error response
    pub async fn error_from(response: Response) -> DataError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        remote_error(status, &text)
    }
}

/// Map a status and raw error body onto a [`DataError`]
pub(crate) fn remote_error(status: u16, text: &str) -> DataError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();

    // storage reports conflicts as 400 with an embedded statusCode
    let embedded = match &body.status_code {
        Some(serde_json::Value::String(s)) => s.parse::<u16>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    };
    let status = match embedded {
        Some(code) => code,
        None if body.error.as_deref() == Some("Duplicate") => 409,
        None => status,
    };

    // auth reports numeric codes next to a symbolic error_code
    let code = match body.code {
        Some(serde_json::Value::String(code)) => Some(code),
        Some(serde_json::Value::Number(n)) => body.error_code.or_else(|| Some(n.to_string())),
        _ => body.error_code,
    };

    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .or(body.error)
        .or(body.details)
        .or(body.hint)
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                text.trim().to_string()
            }
        });

    DataError::Remote {
        status,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> RestClient {
        RestClient::new(&ClientConfig::new(url, "anon")).unwrap()
    }

    #[test]
    fn test_rest_url() {
        let c = client("https://demo.supabase.co/");
        assert_eq!(
            c.rest_url(&["products"]).as_str(),
            "https://demo.supabase.co/rest/v1/products"
        );
        assert_eq!(
            c.rest_url(&["rpc", "station_totals"]).as_str(),
            "https://demo.supabase.co/rest/v1/rpc/station_totals"
        );
    }

    #[test]
    fn test_storage_url_encodes_segments() {
        let c = client("http://localhost:54321");
        assert_eq!(
            c.storage_url(&["reports", "2024 06", "day.pdf"]).as_str(),
            "http://localhost:54321/storage/v1/object/reports/2024%2006/day.pdf"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(RestClient::new(&ClientConfig::new("ftp://x", "anon")).is_err());
    }

    #[test]
    fn test_remote_error_from_table_api() {
        let err = remote_error(
            406,
            r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        match err {
            DataError::Remote { status, code, message } => {
                assert_eq!(status, 406);
                assert_eq!(code.as_deref(), Some("PGRST116"));
                assert!(message.starts_with("JSON object requested"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_remote_error_from_storage_api() {
        let err = remote_error(
            400,
            r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#,
        );
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "The resource already exists");
    }

    #[test]
    fn test_remote_error_duplicate_without_status() {
        let err = remote_error(400, r#"{"statusCode":409,"error":"Duplicate"}"#);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "Duplicate");

        let err = remote_error(400, r#"{"error":"Duplicate","message":"exists"}"#);
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_auth_url() {
        let c = client("https://demo.supabase.co");
        assert_eq!(c.auth_url(&["user"]).as_str(), "https://demo.supabase.co/auth/v1/user");
    }

    #[test]
    fn test_remote_error_from_auth_api() {
        let err = remote_error(
            422,
            r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#,
        );
        match err {
            DataError::Remote { status, code, message } => {
                assert_eq!(status, 422);
                assert_eq!(code.as_deref(), Some("user_already_exists"));
                assert_eq!(message, "User already registered");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = remote_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn test_remote_error_plain_text() {
        let err = remote_error(502, "");
        assert_eq!(err.to_string(), "Request failed with status 502");
    }
}
