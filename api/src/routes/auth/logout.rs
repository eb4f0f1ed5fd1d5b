use actix_web::{web, HttpResponse};

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;

use crate::dto::auth_dto::{LogoutResponse, RefreshTokenRequest};
use crate::handlers::error_handler::handle_domain_error;
use crate::state::AppState;

/// Handler for POST /auth/logout
///
/// Revokes the presented refresh token. Idempotent: an unknown or
/// already-revoked token still answers `{"success": true}` so clients
/// can always clear local state.
pub async fn logout<R, I>(
    state: web::Data<AppState<R, I>>,
    request: web::Json<RefreshTokenRequest>,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    match state.tokens.revoke(&request.refresh_token).await {
        Ok(()) => HttpResponse::Ok().json(LogoutResponse { success: true }),
        Err(error) => handle_domain_error(error),
    }
}
