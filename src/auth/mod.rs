//! # Accounts
//!
//! Sign-up and current-user lookup against the hosted auth API. The portal
//! role of an account does not live in the auth server; it comes from the
//! account's `user_profiles` row, which the service joins in.

pub mod memory;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataResult;
use crate::schema::UserProfileRow;

pub use memory::MemoryAuth;
pub use rest::RestAuth;

/// Role of an account that has no profile row
pub const DEFAULT_ROLE: &str = "Employee";

/// Minimum password length the auth server accepts
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An account as the auth server reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
}

/// Email and password of a new account
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tokens issued to a signed-in account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(default)]
    pub token_type: String,

    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Outcome of a sign-up.
///
/// `session` is `None` while the address still awaits confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub user: AuthUser,
    pub session: Option<Session>,
}

impl Registration {
    /// Decode a sign-up response, which is either a session carrying the
    /// user or, before confirmation, the bare user
    pub fn from_response(body: Value) -> DataResult<Self> {
        match body.get("user").cloned() {
            Some(user) => Ok(Self {
                user: serde_json::from_value(user)?,
                session: Some(serde_json::from_value(body)?),
            }),
            None => Ok(Self {
                user: serde_json::from_value(body)?,
                session: None,
            }),
        }
    }
}

/// The signed-in account with its portal role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub role: String,
    pub profile: Option<UserProfileRow>,
}

impl CurrentUser {
    pub fn new(user: AuthUser, profile: Option<UserProfileRow>) -> Self {
        let role = profile
            .as_ref()
            .map(|p| p.role.trim())
            .filter(|role| !role.is_empty())
            .unwrap_or(DEFAULT_ROLE)
            .to_string();

        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            role,
            profile,
        }
    }
}

/// Account operations
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve the account an access token was issued to
    async fn user(&self, access_token: &str) -> DataResult<AuthUser>;

    /// Create an account
    async fn sign_up(&self, credentials: &Credentials) -> DataResult<Registration>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_with_session() {
        let registration = Registration::from_response(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "u-1", "email": "ana@example.com", "created_at": "2024-06-01T00:00:00Z"}
        }))
        .unwrap();

        assert_eq!(registration.user.id, "u-1");
        let session = registration.session.unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[test]
    fn test_registration_awaiting_confirmation() {
        let registration = Registration::from_response(json!({
            "id": "u-2",
            "email": "ben@example.com",
            "confirmation_sent_at": "2024-06-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(registration.user.email.as_deref(), Some("ben@example.com"));
        assert!(registration.session.is_none());
    }

    #[test]
    fn test_role_defaults_without_profile() {
        let user = AuthUser {
            id: "u-1".into(),
            email: None,
            created_at: None,
        };
        assert_eq!(CurrentUser::new(user.clone(), None).role, DEFAULT_ROLE);

        let blank = UserProfileRow::default();
        assert_eq!(CurrentUser::new(user.clone(), Some(blank)).role, DEFAULT_ROLE);

        let manager = UserProfileRow {
            role: "Administrator".into(),
            ..Default::default()
        };
        assert_eq!(CurrentUser::new(user, Some(manager)).role, "Administrator");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("ana@example.com", "hunter22");
        assert!(!format!("{:?}", credentials).contains("hunter22"));
    }
}
