//! Authentication route handlers
//!
//! Endpoints:
//! - Credential login, registration, and Google sign-in
//! - Token refresh with rotation
//! - Logout (single session, all sessions)
//! - Active session listing and per-session revocation

pub mod google;
pub mod login;
pub mod logout;
pub mod logout_all;
pub mod refresh;
pub mod register;
pub mod sessions;

use actix_web::{http::header, HttpRequest, HttpResponse};

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::VerifiedIdentity;
use muse_core::services::token::TokenService;

use crate::dto::auth_dto::AuthResponse;
use crate::handlers::error_handler::handle_domain_error;

/// Longest device label persisted per session.
const DEVICE_LABEL_MAX: usize = 255;

/// Issues a token pair for a verified identity and renders the auth
/// response. Shared by login, register, and Google sign-in.
pub(crate) async fn issue_for_identity<R: TokenRepository>(
    tokens: &TokenService<R>,
    identity: VerifiedIdentity,
    request: &HttpRequest,
) -> HttpResponse {
    match tokens
        .issue_pair(
            identity.user_id,
            &identity.email,
            device_label(request),
            origin_address(request),
        )
        .await
    {
        Ok(pair) => HttpResponse::Ok().json(AuthResponse::new(identity, pair)),
        Err(error) => handle_domain_error(error),
    }
}

/// User-Agent header, truncated, used as the session's device label.
pub(crate) fn device_label(request: &HttpRequest) -> Option<String> {
    let agent = request.headers().get(header::USER_AGENT)?.to_str().ok()?;
    Some(agent.chars().take(DEVICE_LABEL_MAX).collect())
}

/// Peer address as seen through proxy headers.
pub(crate) fn origin_address(request: &HttpRequest) -> Option<String> {
    request
        .connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}
