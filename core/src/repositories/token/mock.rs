//! In-memory implementation of TokenRepository for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::RefreshToken;
use crate::errors::DomainError;

use super::r#trait::TokenRepository;

/// Mock token repository for testing
///
/// The write lock makes every mutation atomic, which is exactly the
/// guarantee `revoke_if_active` requires from real backends.
#[derive(Clone, Default)]
pub struct MockTokenRepository {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl MockTokenRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rows, revoked ones included
    pub async fn row_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Snapshot of every stored row, for test assertions
    pub async fn all_rows(&self) -> Vec<RefreshToken> {
        self.tokens.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn insert(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let mut tokens = self.tokens.write().await;

        if tokens.contains_key(&token.token_hash) {
            return Err(DomainError::Validation {
                message: "Token already exists".to_string(),
            });
        }

        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshToken>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.values().find(|t| t.id == id).cloned())
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshToken>, DomainError> {
        let tokens = self.tokens.read().await;
        let mut active: Vec<RefreshToken> = tokens
            .values()
            .filter(|t| t.user_id == user_id && t.is_active(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(active)
    }

    async fn revoke_if_active(
        &self,
        token_hash: &str,
        replaced_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tokens = self.tokens.write().await;

        match tokens.get_mut(token_hash) {
            Some(token) if token.is_active(now) => {
                token.revoke(now, replaced_by);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let mut count = 0;

        for token in tokens.values_mut() {
            if token.user_id == user_id && token.is_active(now) {
                token.revoke(now, None);
                count += 1;
            }
        }

        Ok(count)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let initial_count = tokens.len();

        tokens.retain(|_, token| !token.is_expired(now));

        Ok(initial_count - tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_for(user_id: Uuid, hash: &str, now: DateTime<Utc>) -> RefreshToken {
        RefreshToken::new(user_id, hash.to_string(), now, 3600, None, None)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_hash() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        repo.insert(token_for(user_id, "h1", now)).await.unwrap();
        let result = repo.insert(token_for(user_id, "h1", now)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_revoke_if_active_is_single_shot() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();

        repo.insert(token_for(Uuid::new_v4(), "h1", now))
            .await
            .unwrap();

        assert!(repo.revoke_if_active("h1", None, now).await.unwrap());
        assert!(!repo.revoke_if_active("h1", None, now).await.unwrap());
        assert!(!repo.revoke_if_active("missing", None, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_active_listing_is_newest_first() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let older = now - chrono::Duration::minutes(10);
        repo.insert(token_for(user_id, "old", older)).await.unwrap();
        repo.insert(token_for(user_id, "new", now)).await.unwrap();

        let active = repo.find_active_by_user(user_id, now).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].token_hash, "new");
        assert_eq!(active[1].token_hash, "old");
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_rows() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        repo.insert(token_for(user_id, "live", now)).await.unwrap();
        repo.insert(token_for(
            user_id,
            "dead",
            now - chrono::Duration::seconds(7200),
        ))
        .await
        .unwrap();

        let deleted = repo.delete_expired(now).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(repo.row_count().await, 1);
    }
}
