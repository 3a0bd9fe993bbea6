//! # Hosted Table Backend
//!
//! Speaks the PostgREST dialect of the hosted table API:
//! filters and paging in the query string, exact counts in `Content-Range`,
//! and `Prefer: return=representation` so writes echo the stored rows.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::{Selection, TableBackend};
use crate::client::RestClient;
use crate::error::{DataError, DataResult};
use crate::query::{predicate_pairs, Predicate, SelectQuery};

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// Table backend backed by the hosted service
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: RestClient,
}

impl RestBackend {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    async fn rows_from(response: reqwest::Response) -> DataResult<Vec<Value>> {
        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            single @ Value::Object(_) => Ok(vec![single]),
            other => Err(DataError::Decode(format!("expected rows, got {}", other))),
        }
    }
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(&self, query: &SelectQuery) -> DataResult<Selection> {
        let url = self.client.rest_url(&[&query.table]);
        let mut request = self
            .client
            .request(Method::GET, url)
            .query(&query.to_query_pairs());
        if query.count {
            request = request.header(PREFER, COUNT_EXACT);
        }

        let response = request.send().await?;
        let status = response.status();

        // A window past the last row is answered with 416 and the total
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            let total = parse_total(response.headers());
            if total.is_some() {
                return Ok(Selection {
                    rows: Vec::new(),
                    total,
                });
            }
            return Err(RestClient::error_from(response).await);
        }
        if !status.is_success() {
            return Err(RestClient::error_from(response).await);
        }

        let total = if query.count {
            parse_total(response.headers())
        } else {
            None
        };
        let rows = Self::rows_from(response).await?;

        Ok(Selection { rows, total })
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> DataResult<Vec<Value>> {
        let url = self.client.rest_url(&[table]);
        let request = self
            .client
            .request(Method::POST, url)
            .query(&[("select", "*")])
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&rows);

        let response = self.client.send(request).await?;
        Self::rows_from(response).await
    }

    async fn update(&self, table: &str, predicates: &[Predicate], patch: Value) -> DataResult<Vec<Value>> {
        let url = self.client.rest_url(&[table]);
        let request = self
            .client
            .request(Method::PATCH, url)
            .query(&predicate_pairs(predicates))
            .query(&[("select", "*")])
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&patch);

        let response = self.client.send(request).await?;
        Self::rows_from(response).await
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> DataResult<Vec<Value>> {
        let url = self.client.rest_url(&[table]);
        let request = self
            .client
            .request(Method::DELETE, url)
            .query(&predicate_pairs(predicates))
            .header(PREFER, RETURN_REPRESENTATION);

        let response = self.client.send(request).await?;
        Self::rows_from(response).await
    }

    async fn rpc(&self, function: &str, args: Value) -> DataResult<Value> {
        let url = self.client.rest_url(&["rpc", function]);
        let request = self.client.request(Method::POST, url).json(&args);

        let response = self.client.send(request).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Total from `Content-Range: <from>-<to>/<total>` or `*/<total>`
fn parse_total(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

pub(crate) fn parse_content_range(value: &str) -> Option<usize> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-9/12"), Some(12));
        assert_eq!(parse_content_range("*/12"), Some(12));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }
}
