use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_shared::types::ErrorResponse;

use crate::dto::auth_dto::LoginRequest;
use crate::handlers::error_handler::handle_domain_error;
use crate::state::AppState;

use super::issue_for_identity;

/// Handler for POST /auth/login
///
/// Verifies credentials against the identity subsystem and issues a
/// fresh access/refresh token pair.
///
/// # Errors
/// - 400 Bad Request: malformed email or empty password
/// - 401 Unauthorized: credentials rejected
pub async fn login<R, I>(
    state: web::Data<AppState<R, I>>,
    request: web::Json<LoginRequest>,
    http_request: HttpRequest,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    if let Err(errors) = request.validate() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("VALIDATION_ERROR", errors.to_string()));
    }

    match state
        .identity
        .verify_password(&request.email, &request.password)
        .await
    {
        Ok(identity) => issue_for_identity(&state.tokens, identity, &http_request).await,
        Err(error) => handle_domain_error(error),
    }
}
