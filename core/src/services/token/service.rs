//! Main token lifecycle service implementation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{
    Claims, RefreshToken, SessionSummary, TokenPair, JWT_AUDIENCE, JWT_ISSUER,
};
use crate::domain::entities::user::User;
use crate::errors::{DomainError, DomainResult, TokenError};
use crate::repositories::TokenRepository;
use crate::services::identity::UserDirectory;

use super::clock::Clock;
use super::config::TokenServiceConfig;

/// Length of generated opaque refresh token values
const REFRESH_TOKEN_LENGTH: usize = 48;

/// Outcome of a successful refresh: the rotated pair plus the owning user
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub user: User,
    pub tokens: TokenPair,
}

/// Service managing the refresh token lifecycle and access token minting
///
/// The service holds no session state of its own; any number of instances
/// may run concurrently against the same repository. Rotation correctness
/// rests on the repository's `revoke_if_active` compare-and-set.
pub struct TokenService<R: TokenRepository> {
    repository: R,
    directory: Arc<dyn UserDirectory>,
    config: TokenServiceConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl<R: TokenRepository> TokenService<R> {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `repository` - Refresh token persistence
    /// * `directory` - User lookup for refresh-time claims
    /// * `config` - Secrets and token lifetimes
    /// * `clock` - Time source for every expiry decision
    ///
    /// # Errors
    ///
    /// `TokenError::NotConfigured` when the signing secret is empty. This is
    /// a startup failure; it is never surfaced per-request.
    pub fn new(
        repository: R,
        directory: Arc<dyn UserDirectory>,
        config: TokenServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        if config.jwt_secret.is_empty() {
            return Err(DomainError::Token(TokenError::NotConfigured {
                reason: "JWT signing secret is empty".to_string(),
            }));
        }

        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[JWT_ISSUER]);
        validation.set_audience(&[JWT_AUDIENCE]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Ok(Self {
            repository,
            directory,
            config,
            encoding_key,
            decoding_key,
            validation,
            clock,
        })
    }

    /// Issues a fresh access/refresh token pair for a verified user
    ///
    /// One refresh token row is inserted; one access token is signed.
    pub async fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        device_label: Option<String>,
        origin_address: Option<String>,
    ) -> DomainResult<TokenPair> {
        let now = self.clock.now();

        let token_value = Self::generate_token_value();
        let record = RefreshToken::new(
            user_id,
            Self::hash_token(&token_value),
            now,
            self.config.refresh_token_ttl,
            device_label,
            origin_address,
        );
        self.repository.insert(record).await?;

        let access_token = self.mint_access_token(user_id, email, now)?;

        info!(user_id = %user_id, "issued token pair");

        Ok(TokenPair::new(
            access_token,
            token_value,
            self.config.access_token_ttl,
            self.config.refresh_token_ttl,
        ))
    }

    /// Rotates a refresh token, returning a new pair
    ///
    /// The presented token is single-use: on success it is revoked with its
    /// successor recorded, and a new row is inserted. Of two concurrent
    /// calls presenting the same token, exactly one succeeds; the other
    /// fails with `RefreshTokenReused`.
    ///
    /// # Errors
    ///
    /// * `InvalidRefreshToken` - no matching row, or owner no longer exists
    /// * `RefreshTokenExpired` - row matched but is past its expiry
    /// * `RefreshTokenReused` - row was already revoked (replay of a
    ///   rotated-away token), or this call lost the rotation race
    pub async fn refresh(
        &self,
        presented: &str,
        device_label: Option<String>,
        origin_address: Option<String>,
    ) -> DomainResult<RefreshGrant> {
        let now = self.clock.now();
        let hash = Self::hash_token(presented);

        let old = self
            .repository
            .find_by_hash(&hash)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        if old.is_revoked() {
            warn!(
                token_id = %old.id,
                user_id = %old.user_id,
                "revoked refresh token presented again; possible token theft"
            );
            return Err(TokenError::RefreshTokenReused.into());
        }
        if old.is_expired(now) {
            return Err(TokenError::RefreshTokenExpired.into());
        }

        let email = self
            .directory
            .find_email(old.user_id)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        // The successor id is chosen before any write so the revoked row can
        // point at its replacement. Revoking first means no observer ever
        // sees both tokens active; a failure between the two writes leaves
        // the old token revoked, which fails closed.
        let successor_id = Uuid::new_v4();
        let won = self
            .repository
            .revoke_if_active(&hash, Some(successor_id), now)
            .await?;
        if !won {
            warn!(
                token_id = %old.id,
                user_id = %old.user_id,
                "lost rotation race; treating as refresh token reuse"
            );
            return Err(TokenError::RefreshTokenReused.into());
        }

        let token_value = Self::generate_token_value();
        let successor = RefreshToken::new_with_id(
            successor_id,
            old.user_id,
            Self::hash_token(&token_value),
            now,
            self.config.refresh_token_ttl,
            device_label,
            origin_address,
        );
        self.repository.insert(successor).await?;

        let access_token = self.mint_access_token(old.user_id, &email, now)?;

        info!(user_id = %old.user_id, rotated_from = %old.id, "rotated refresh token");

        Ok(RefreshGrant {
            user: User::new(old.user_id, email),
            tokens: TokenPair::new(
                access_token,
                token_value,
                self.config.access_token_ttl,
                self.config.refresh_token_ttl,
            ),
        })
    }

    /// Revokes the refresh token matching the presented value
    ///
    /// Idempotent: revoking an unknown or already-revoked token is
    /// indistinguishable from success, so the endpoint cannot be used as a
    /// token-scanning oracle.
    pub async fn revoke(&self, presented: &str) -> DomainResult<()> {
        let now = self.clock.now();
        let hash = Self::hash_token(presented);

        let revoked = self.repository.revoke_if_active(&hash, None, now).await?;
        if revoked {
            info!("refresh token revoked");
        }
        Ok(())
    }

    /// Revokes every active session for a user
    ///
    /// Used for logout-all; doubles as a security kill switch.
    pub async fn revoke_all(&self, user_id: Uuid) -> DomainResult<usize> {
        let now = self.clock.now();
        let count = self.repository.revoke_all_for_user(user_id, now).await?;
        info!(user_id = %user_id, revoked = count, "revoked all sessions");
        Ok(count)
    }

    /// Lists the user's active sessions, newest first
    ///
    /// Token values and hashes are never exposed.
    pub async fn list_active_sessions(&self, user_id: Uuid) -> DomainResult<Vec<SessionSummary>> {
        let now = self.clock.now();
        let tokens = self.repository.find_active_by_user(user_id, now).await?;
        Ok(tokens.iter().map(RefreshToken::summary).collect())
    }

    /// Revokes a single session if it is active and owned by the caller
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Session revoked
    /// * `Ok(false)` - Session unknown, inactive, or owned by someone else
    pub async fn revoke_session(&self, user_id: Uuid, session_id: Uuid) -> DomainResult<bool> {
        let now = self.clock.now();

        let token = match self.repository.find_by_id(session_id).await? {
            Some(token) if token.user_id == user_id => token,
            _ => return Ok(false),
        };

        self.repository
            .revoke_if_active(&token.token_hash, None, now)
            .await
    }

    /// Verifies an access token: pure signature + expiry check
    ///
    /// No store access happens here; revoking a refresh token does not
    /// invalidate access tokens already in flight (they age out on their
    /// own short expiry).
    pub fn verify_access(&self, token: &str) -> DomainResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        DomainError::Token(TokenError::TokenExpired)
                    }
                    jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                        DomainError::Token(TokenError::TokenNotYetValid)
                    }
                    _ => DomainError::Token(TokenError::InvalidTokenFormat),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Removes refresh tokens that expired before now
    pub async fn cleanup_expired(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        self.repository.delete_expired(now).await
    }

    /// Signs an access token for the given user
    fn mint_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<String> {
        let claims = Claims::new_access_token(user_id, email, now, self.config.access_token_ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }

    /// Generates an unguessable opaque token value
    fn generate_token_value() -> String {
        let mut rng = rand::thread_rng();
        (0..REFRESH_TOKEN_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..62);
                match idx {
                    0..10 => (b'0' + idx) as char,
                    10..36 => (b'a' + idx - 10) as char,
                    36..62 => (b'A' + idx - 36) as char,
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    /// Hashes a token value for storage and lookup
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
