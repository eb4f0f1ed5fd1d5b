//! Token repository trait defining the interface for refresh token persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::token::RefreshToken;
use crate::errors::DomainError;

/// Repository trait for RefreshToken entity persistence operations
///
/// This trait defines the contract for managing refresh tokens in durable
/// storage. The server itself keeps no in-memory session state and may run
/// as many horizontally-scaled processes; rotation correctness therefore
/// rests entirely on the conditional-write semantics specified here.
///
/// # Security Considerations
/// - Only token hashes are stored, never raw token values
/// - Revoked rows are kept for session history, not deleted
/// - `revoke_if_active` must be atomic with respect to concurrent callers
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a new refresh token
    ///
    /// # Returns
    /// * `Ok(RefreshToken)` - The saved token
    /// * `Err(DomainError)` - Save failed (e.g. duplicate token hash)
    async fn insert(&self, token: RefreshToken) -> Result<RefreshToken, DomainError>;

    /// Find a refresh token by its hashed value
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError>;

    /// Find a refresh token by its ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshToken>, DomainError>;

    /// Find all active refresh tokens for a user, newest first
    ///
    /// Active means not revoked and not expired at `now`.
    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshToken>, DomainError>;

    /// Revoke a token only if it is still active at write time
    ///
    /// This is the compare-and-set that closes the race window between two
    /// concurrent refresh attempts: of two callers presenting the same
    /// token, exactly one observes `true`. Implementations must perform the
    /// check and the write as a single atomic step (conditional UPDATE or
    /// equivalent), never as read-then-write.
    ///
    /// # Arguments
    /// * `token_hash` - The hashed token value to revoke
    /// * `replaced_by` - Successor token id when revoking as part of rotation
    /// * `now` - Revocation timestamp and expiry reference point
    ///
    /// # Returns
    /// * `Ok(true)` - Token was active and is now revoked
    /// * `Ok(false)` - Token was missing, already revoked, or expired
    async fn revoke_if_active(
        &self,
        token_hash: &str,
        replaced_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Revoke every active refresh token for a user
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of tokens revoked
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError>;

    /// Delete refresh tokens that expired before `now`
    ///
    /// Retention cleanup; should be called periodically.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows deleted
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;
}
