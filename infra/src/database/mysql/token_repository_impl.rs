//! MySQL implementation of the TokenRepository trait.
//!
//! Refresh token persistence using MySQL with SQLx. The rotation-critical
//! `revoke_if_active` is a single conditional UPDATE: the WHERE clause
//! carries the "still active" check so the database, not the application,
//! decides the winner of concurrent rotation attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use muse_core::domain::entities::token::RefreshToken;
use muse_core::errors::DomainError;
use muse_core::repositories::TokenRepository;

/// MySQL implementation of TokenRepository
pub struct MySqlTokenRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlTokenRepository {
    /// Create a new MySQL token repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert a database row to a RefreshToken entity
    fn row_to_token(row: &sqlx::mysql::MySqlRow) -> Result<RefreshToken, DomainError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| internal(format!("Failed to get id: {}", e)))?;
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| internal(format!("Failed to get user_id: {}", e)))?;
        let replaced_by: Option<String> = row
            .try_get("replaced_by")
            .map_err(|e| internal(format!("Failed to get replaced_by: {}", e)))?;

        Ok(RefreshToken {
            id: Uuid::parse_str(&id)
                .map_err(|e| internal(format!("Invalid token UUID: {}", e)))?,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| internal(format!("Invalid user UUID: {}", e)))?,
            token_hash: row
                .try_get("token_hash")
                .map_err(|e| internal(format!("Failed to get token_hash: {}", e)))?,
            issued_at: row
                .try_get::<DateTime<Utc>, _>("issued_at")
                .map_err(|e| internal(format!("Failed to get issued_at: {}", e)))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| internal(format!("Failed to get expires_at: {}", e)))?,
            revoked_at: row
                .try_get::<Option<DateTime<Utc>>, _>("revoked_at")
                .map_err(|e| internal(format!("Failed to get revoked_at: {}", e)))?,
            replaced_by: replaced_by
                .map(|v| Uuid::parse_str(&v))
                .transpose()
                .map_err(|e| internal(format!("Invalid successor UUID: {}", e)))?,
            device_label: row
                .try_get("device_label")
                .map_err(|e| internal(format!("Failed to get device_label: {}", e)))?,
            origin_address: row
                .try_get("origin_address")
                .map_err(|e| internal(format!("Failed to get origin_address: {}", e)))?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, token_hash, issued_at, expires_at, \
                              revoked_at, replaced_by, device_label, origin_address";

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn insert(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let query = r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_hash, issued_at, expires_at,
                revoked_at, replaced_by, device_label, origin_address
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(token.id.to_string())
            .bind(token.user_id.to_string())
            .bind(&token.token_hash)
            .bind(token.issued_at)
            .bind(token.expires_at)
            .bind(token.revoked_at)
            .bind(token.replaced_by.map(|id| id.to_string()))
            .bind(&token.device_label)
            .bind(&token.origin_address)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_unique_violation() => DomainError::Validation {
                    message: "Token already exists".to_string(),
                },
                _ => internal(format!("Failed to save refresh token: {}", e)),
            })?;

        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = ? LIMIT 1",
            SELECT_COLUMNS
        );

        let result = sqlx::query(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to find refresh token: {}", e)))?;

        result.as_ref().map(Self::row_to_token).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE id = ? LIMIT 1",
            SELECT_COLUMNS
        );

        let result = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to find refresh token: {}", e)))?;

        result.as_ref().map(Self::row_to_token).transpose()
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM refresh_tokens \
             WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ? \
             ORDER BY issued_at DESC",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to list user tokens: {}", e)))?;

        rows.iter().map(Self::row_to_token).collect()
    }

    async fn revoke_if_active(
        &self,
        token_hash: &str,
        replaced_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        // Conditional write: affects zero rows when the token was already
        // revoked or expired, which signals a lost rotation race.
        let query = r#"
            UPDATE refresh_tokens
            SET revoked_at = ?, replaced_by = ?
            WHERE token_hash = ? AND revoked_at IS NULL AND expires_at > ?
        "#;

        let result = sqlx::query(query)
            .bind(now)
            .bind(replaced_by.map(|id| id.to_string()))
            .bind(token_hash)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to revoke token: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let query = r#"
            UPDATE refresh_tokens
            SET revoked_at = ?
            WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ?
        "#;

        let result = sqlx::query(query)
            .bind(now)
            .bind(user_id.to_string())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to revoke user tokens: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| internal(format!("Failed to delete expired tokens: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }
}

/// Store failures surface as internal errors, never as token errors: an
/// unreachable database must not read as "token invalid".
fn internal(message: String) -> DomainError {
    DomainError::Internal { message }
}
