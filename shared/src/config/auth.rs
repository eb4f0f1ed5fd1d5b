//! Authentication configuration

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped with development builds.
pub const DEFAULT_DEV_SECRET: &str = "development-secret-change-in-production";

/// JWT authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// JWT secret key for signing tokens
    pub secret: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::from(DEFAULT_DEV_SECRET),
            access_token_expiry: 900,     // 15 minutes
            refresh_token_expiry: 604800, // 7 days
            issuer: String::from("muse"),
            audience: String::from("muse-api"),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Check if using default secret (security warning)
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEFAULT_DEV_SECRET
    }

    /// Load configuration from environment variables
    ///
    /// Reads `JWT_SECRET`, `ACCESS_TOKEN_EXPIRY` (seconds) and
    /// `REFRESH_TOKEN_EXPIRY` (seconds), falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Self::new(secret),
            _ => Self::default(),
        };

        if let Ok(Ok(seconds)) = std::env::var("ACCESS_TOKEN_EXPIRY").map(|v| v.parse()) {
            config.access_token_expiry = seconds;
        }
        if let Ok(Ok(seconds)) = std::env::var("REFRESH_TOKEN_EXPIRY").map(|v| v.parse()) {
            config.refresh_token_expiry = seconds;
        }

        config
    }
}
