//! Identity verification seam
//!
//! Credential checking (password hashing, OAuth token validation) is owned
//! by the identity subsystem and consumed here as an oracle: credentials go
//! in, a verified `{user_id, email}` pair comes out or verification fails.
//! The token lifecycle never sees passwords or provider tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AuthError, DomainError, DomainResult};

/// Outcome of a successful identity verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: Uuid,
    pub email: String,
}

/// External oracle that turns credentials into a verified identity
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify an email/password pair
    async fn verify_password(&self, email: &str, password: &str)
        -> DomainResult<VerifiedIdentity>;

    /// Register a new account and return its identity
    async fn register(&self, email: &str, password: &str) -> DomainResult<VerifiedIdentity>;

    /// Verify a Google OAuth ID token
    async fn verify_google(&self, id_token: &str) -> DomainResult<VerifiedIdentity>;
}

/// Lookup of a known user by id, used when refreshing tokens
///
/// Kept separate from [`IdentityVerifier`] because refresh presents no
/// credentials; it only needs the directory half of the identity subsystem.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_email(&self, user_id: Uuid) -> DomainResult<Option<String>>;
}

/// In-memory identity oracle for tests and local development
///
/// Stores plaintext passwords; this stands in for the real identity
/// subsystem and must never back a deployment.
#[derive(Clone, Default)]
pub struct MockIdentityVerifier {
    accounts: Arc<RwLock<HashMap<String, (String, Uuid)>>>,
}

impl MockIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, returning its generated user id
    pub async fn add_account(&self, email: &str, password: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.accounts
            .write()
            .await
            .insert(email.to_string(), (password.to_string(), user_id));
        user_id
    }
}

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> DomainResult<VerifiedIdentity> {
        let accounts = self.accounts.read().await;
        match accounts.get(email) {
            Some((stored, user_id)) if stored == password => Ok(VerifiedIdentity {
                user_id: *user_id,
                email: email.to_string(),
            }),
            _ => Err(DomainError::Auth(AuthError::InvalidCredentials)),
        }
    }

    async fn register(&self, email: &str, password: &str) -> DomainResult<VerifiedIdentity> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(DomainError::Auth(AuthError::UserAlreadyExists));
        }
        let user_id = Uuid::new_v4();
        accounts.insert(email.to_string(), (password.to_string(), user_id));
        Ok(VerifiedIdentity {
            user_id,
            email: email.to_string(),
        })
    }

    async fn verify_google(&self, id_token: &str) -> DomainResult<VerifiedIdentity> {
        // The mock treats the ID token as "google:<email>".
        let email = id_token
            .strip_prefix("google:")
            .ok_or(DomainError::Auth(AuthError::InvalidCredentials))?;

        let mut accounts = self.accounts.write().await;
        let (_, user_id) = accounts
            .entry(email.to_string())
            .or_insert_with(|| (String::new(), Uuid::new_v4()));
        Ok(VerifiedIdentity {
            user_id: *user_id,
            email: email.to_string(),
        })
    }
}

#[async_trait]
impl UserDirectory for MockIdentityVerifier {
    async fn find_email(&self, user_id: Uuid) -> DomainResult<Option<String>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|(_, (_, id))| *id == user_id)
            .map(|(email, _)| email.clone()))
    }
}
