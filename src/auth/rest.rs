//! # Hosted Auth Backend
//!
//! `GET /auth/v1/user` with the user's own access token, and
//! `POST /auth/v1/signup` with the project key.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::{AuthBackend, AuthUser, Credentials, Registration};
use crate::client::RestClient;
use crate::error::DataResult;

/// Auth backend backed by the hosted service
#[derive(Debug, Clone)]
pub struct RestAuth {
    client: RestClient,
}

impl RestAuth {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }
}

#[async_trait]
impl AuthBackend for RestAuth {
    async fn user(&self, access_token: &str) -> DataResult<AuthUser> {
        let url = self.client.auth_url(&["user"]);
        let request = self.client.request_as(Method::GET, url, access_token);
        let response = self.client.send(request).await?;
        Ok(response.json::<AuthUser>().await?)
    }

    async fn sign_up(&self, credentials: &Credentials) -> DataResult<Registration> {
        let url = self.client.auth_url(&["signup"]);
        let request = self.client.request(Method::POST, url).json(credentials);
        let response = self.client.send(request).await?;
        Registration::from_response(response.json::<Value>().await?)
    }
}
