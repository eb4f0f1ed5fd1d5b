//! Maps domain errors onto HTTP responses
//!
//! Refresh token rejections deliberately collapse onto one generic 401
//! body: a caller must not be able to distinguish "expired" from
//! "revoked" from "reuse detected", since the latter reveals that a
//! stolen token was noticed.

use actix_web::HttpResponse;
use tracing::error;

use muse_core::errors::{AuthError, DomainError, TokenError};
use muse_shared::types::ErrorResponse;

pub fn handle_domain_error(error: DomainError) -> HttpResponse {
    match error {
        DomainError::Token(token_error) => match token_error {
            TokenError::NotConfigured { reason } => {
                error!(%reason, "token service misconfigured");
                internal_error()
            }
            TokenError::TokenGenerationFailed => {
                error!("token generation failed");
                internal_error()
            }
            _ => unauthorized(),
        },

        DomainError::Auth(auth_error) => match auth_error {
            AuthError::InvalidCredentials => HttpResponse::Unauthorized().json(
                ErrorResponse::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AuthError::UserAlreadyExists => HttpResponse::Conflict().json(ErrorResponse::new(
                "USER_EXISTS",
                "An account with this email already exists",
            )),
            AuthError::SessionExpired => unauthorized(),
        },

        DomainError::Unauthorized => unauthorized(),

        DomainError::Validation { message } => {
            HttpResponse::BadRequest().json(ErrorResponse::new("VALIDATION_ERROR", message))
        }

        DomainError::NotFound { resource } => HttpResponse::NotFound().json(ErrorResponse::new(
            "NOT_FOUND",
            format!("{} not found", resource),
        )),

        DomainError::Internal { message } => {
            error!(%message, "internal error");
            internal_error()
        }
    }
}

/// The single 401 body used for every token rejection.
pub fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorResponse::new(
        "UNAUTHORIZED",
        "Invalid or expired token",
    ))
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse::new(
        "INTERNAL_ERROR",
        "An internal error occurred",
    ))
}
