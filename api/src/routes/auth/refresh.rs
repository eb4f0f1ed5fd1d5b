use actix_web::{web, HttpRequest, HttpResponse};

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;

use crate::dto::auth_dto::{AuthResponse, RefreshTokenRequest};
use crate::handlers::error_handler::handle_domain_error;
use crate::state::AppState;

use super::{device_label, origin_address};

/// Handler for POST /auth/refresh
///
/// Rotates the presented refresh token: the old token is revoked, its
/// successor is persisted, and a new access token is minted. A reused,
/// expired, or unknown token answers 401 with the generic body.
///
/// # Request Body
///
/// ```json
/// { "refreshToken": "string" }
/// ```
pub async fn refresh<R, I>(
    state: web::Data<AppState<R, I>>,
    request: web::Json<RefreshTokenRequest>,
    http_request: HttpRequest,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    match state
        .tokens
        .refresh(
            &request.refresh_token,
            device_label(&http_request),
            origin_address(&http_request),
        )
        .await
    {
        Ok(grant) => HttpResponse::Ok().json(AuthResponse::from(grant)),
        Err(error) => handle_domain_error(error),
    }
}
