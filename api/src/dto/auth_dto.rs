//! Authentication request/response DTOs
//!
//! Wire names are camelCase to match the client contract.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use muse_core::domain::entities::token::{SessionSummary, TokenPair};
use muse_core::services::identity::VerifiedIdentity;
use muse_core::services::token::RefreshGrant;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    #[validate(length(min = 1))]
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub user: UserDto,
}

impl AuthResponse {
    pub fn new(identity: VerifiedIdentity, tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            refresh_expires_in: tokens.refresh_expires_in,
            user: UserDto {
                id: identity.user_id,
                email: identity.email,
            },
        }
    }
}

impl From<RefreshGrant> for AuthResponse {
    fn from(grant: RefreshGrant) -> Self {
        Self {
            access_token: grant.tokens.access_token,
            refresh_token: grant.tokens.refresh_token,
            expires_in: grant.tokens.expires_in,
            refresh_expires_in: grant.tokens.refresh_expires_in,
            user: UserDto {
                id: grant.user.id,
                email: grant.user.email,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub device_label: Option<String>,
    pub origin_address: Option<String>,
}

impl From<SessionSummary> for SessionResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.id,
            issued_at: summary.issued_at,
            expires_at: summary.expires_at,
            device_label: summary.device_label,
            origin_address: summary.origin_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_uses_camel_case_wire_names() {
        let response = AuthResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 900,
            refresh_expires_in: 604800,
            user: UserDto {
                id: Uuid::new_v4(),
                email: "user@example.com".to_string(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("accessToken").is_some());
        assert!(json.get("refreshToken").is_some());
        assert!(json.get("expiresIn").is_some());
        assert!(json.get("refreshExpiresIn").is_some());
    }

    #[test]
    fn test_refresh_request_parses_camel_case() {
        let request: RefreshTokenRequest =
            serde_json::from_str(r#"{"refreshToken":"abc123"}"#).unwrap();
        assert_eq!(request.refresh_token, "abc123");
    }
}
