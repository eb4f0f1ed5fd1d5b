//! Error type definitions for authentication and token management.
//!
//! The API layer maps these variants onto HTTP statuses and stable error
//! codes; infrastructure failures are deliberately kept out of this
//! taxonomy so they can never be mistaken for authentication failures.

use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Session expired")]
    SessionExpired,
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Access token expired")]
    TokenExpired,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// A rotated-away or revoked refresh token was presented again.
    ///
    /// Collapsed to the same response as `InvalidRefreshToken` at the API
    /// boundary, but kept distinct so reuse can be flagged in logs as a
    /// possible token theft.
    #[error("Refresh token reuse detected")]
    RefreshTokenReused,

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("Token signing is not configured: {reason}")]
    NotConfigured { reason: String },
}
