//! # In-Memory Auth Backend
//!
//! Accounts held in process, for tests and offline use. Error statuses and
//! messages follow the hosted auth API.

use std::sync::RwLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

use super::{AuthBackend, AuthUser, Credentials, Registration, Session, MIN_PASSWORD_LENGTH};
use crate::error::{DataError, DataResult};

/// Lifetime reported for issued access tokens, in seconds
const TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password_hash: String,
    confirmed: bool,
    access_token: Option<String>,
}

/// In-memory account store
#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: RwLock<Vec<Account>>,
    require_confirmation: bool,
}

impl MemoryAuth {
    /// Store that signs accounts in as soon as they register
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose new accounts get no session until confirmed
    pub fn requiring_confirmation() -> Self {
        Self {
            require_confirmation: true,
            ..Self::default()
        }
    }

    /// Number of registered accounts
    pub fn account_count(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }

    /// Mark an account's address as confirmed
    pub fn confirm(&self, email: &str) -> DataResult<()> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        let account = accounts
            .iter_mut()
            .find(|a| a.user.email.as_deref() == Some(email))
            .ok_or_else(|| rejected(404, "user_not_found", "User not found"))?;
        account.confirmed = true;
        Ok(())
    }

    /// Password sign-in, replacing any earlier token of the account
    pub fn sign_in(&self, credentials: &Credentials) -> DataResult<Session> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        let account = accounts
            .iter_mut()
            .find(|a| a.user.email.as_deref() == Some(email.as_str()))
            .filter(|a| verify_password(&credentials.password, &a.password_hash))
            .ok_or_else(|| rejected(400, "invalid_credentials", "Invalid login credentials"))?;
        if !account.confirmed {
            return Err(rejected(400, "email_not_confirmed", "Email not confirmed"));
        }

        let session = new_session();
        account.access_token = Some(session.access_token.clone());
        Ok(session)
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn user(&self, access_token: &str) -> DataResult<AuthUser> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        accounts
            .iter()
            .find(|a| a.access_token.as_deref() == Some(access_token))
            .map(|a| a.user.clone())
            .ok_or_else(|| rejected(403, "bad_jwt", "invalid JWT: unable to parse or verify signature"))
    }

    async fn sign_up(&self, credentials: &Credentials) -> DataResult<Registration> {
        let email = credentials.email.trim().to_ascii_lowercase();
        if !is_plausible_email(&email) {
            return Err(rejected(
                400,
                "validation_failed",
                "Unable to validate email address: invalid format",
            ));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(rejected(
                422,
                "weak_password",
                &format!("Password should be at least {} characters.", MIN_PASSWORD_LENGTH),
            ));
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DataError::Internal("Lock poisoned".into()))?;
        if accounts.iter().any(|a| a.user.email.as_deref() == Some(email.as_str())) {
            return Err(rejected(422, "user_already_exists", "User already registered"));
        }

        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        let password_hash = hash_password(&credentials.password)?;
        let session = if self.require_confirmation {
            None
        } else {
            Some(new_session())
        };

        accounts.push(Account {
            user: user.clone(),
            password_hash,
            confirmed: !self.require_confirmation,
            access_token: session.as_ref().map(|s| s.access_token.clone()),
        });

        Ok(Registration { user, session })
    }
}

fn rejected(status: u16, code: &str, message: &str) -> DataError {
    DataError::Remote {
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Argon2id at reduced cost: 1 MiB, one pass
fn hasher() -> DataResult<Argon2<'static>> {
    let params = Params::new(1024, 1, 1, None)
        .map_err(|e| DataError::Internal(format!("argon2 parameters: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Argon2id hash in PHC string form
fn hash_password(password: &str) -> DataResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DataError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    // the PHC string carries its own parameters
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn new_session() -> Session {
    Session {
        access_token: generate_token(),
        token_type: "bearer".to_string(),
        expires_in: Some(TOKEN_LIFETIME_SECS),
        refresh_token: Some(generate_token()),
    }
}

/// 256 random bits, URL-safe base64
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
