//! Token entities for the authentication token lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT issuer
pub const JWT_ISSUER: &str = "muse";

/// JWT audience
pub const JWT_AUDIENCE: &str = "muse-api";

/// Claims structure for the JWT access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Email address of the token owner
    pub email: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID (unique identifier for the token)
    pub jti: String,
}

impl Claims {
    /// Creates new claims for an access token
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user's UUID
    /// * `email` - The user's email address
    /// * `now` - Issuance time
    /// * `ttl_seconds` - Access token lifetime in seconds
    pub fn new_access_token(
        user_id: Uuid,
        email: impl Into<String>,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Self {
        let expiry = now + Duration::seconds(ttl_seconds);

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            nbf: now.timestamp(),
            iss: JWT_ISSUER.to_string(),
            aud: JWT_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Checks if the claims have expired at the given instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Checks if the claims are valid (not expired and past nbf)
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let ts = now.timestamp();
        ts >= self.nbf && ts < self.exp
    }

    /// Gets the user ID from the claims
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

/// Refresh token entity stored in the database
///
/// The raw token value never touches storage; only its SHA-256 hash does.
/// Lifecycle is `active -> revoked` and nothing else: a revoked row is
/// terminal, optionally annotated with the successor minted during rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique identifier for the refresh token
    pub id: Uuid,

    /// User ID this token belongs to
    pub user_id: Uuid,

    /// Hashed token value
    pub token_hash: String,

    /// Timestamp when the token was issued
    pub issued_at: DateTime<Utc>,

    /// Timestamp when the token expires
    pub expires_at: DateTime<Utc>,

    /// Timestamp when the token was revoked, if it has been
    pub revoked_at: Option<DateTime<Utc>>,

    /// Identifier of the token that replaced this one during rotation
    pub replaced_by: Option<Uuid>,

    /// Client user-agent captured at issuance
    pub device_label: Option<String>,

    /// Client network address captured at issuance
    pub origin_address: Option<String>,
}

impl RefreshToken {
    /// Creates a new active refresh token
    pub fn new(
        user_id: Uuid,
        token_hash: String,
        issued_at: DateTime<Utc>,
        ttl_seconds: i64,
        device_label: Option<String>,
        origin_address: Option<String>,
    ) -> Self {
        Self::new_with_id(
            Uuid::new_v4(),
            user_id,
            token_hash,
            issued_at,
            ttl_seconds,
            device_label,
            origin_address,
        )
    }

    /// Creates a new active refresh token with a caller-chosen identifier
    ///
    /// Rotation pre-generates the successor id so the old row can point at
    /// its replacement before the new row exists.
    pub fn new_with_id(
        id: Uuid,
        user_id: Uuid,
        token_hash: String,
        issued_at: DateTime<Utc>,
        ttl_seconds: i64,
        device_label: Option<String>,
        origin_address: Option<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            token_hash,
            issued_at,
            expires_at: issued_at + Duration::seconds(ttl_seconds),
            revoked_at: None,
            replaced_by: None,
            device_label,
            origin_address,
        }
    }

    /// Checks if the refresh token has expired at the given instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Checks if the token has been revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Checks if the refresh token is active
    ///
    /// A token is active when it has neither been revoked nor expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }

    /// Revokes the refresh token, optionally recording its successor
    pub fn revoke(&mut self, now: DateTime<Utc>, replaced_by: Option<Uuid>) {
        self.revoked_at = Some(now);
        self.replaced_by = replaced_by;
    }

    /// Session view of this token, safe to expose to clients
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            device_label: self.device_label.clone(),
            origin_address: self.origin_address.clone(),
        }
    }
}

/// Active-session view of a refresh token
///
/// Never carries the token value or hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub device_label: Option<String>,
    pub origin_address: Option<String>,
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// Opaque refresh token value
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            refresh_expires_in,
        }
    }
}
