use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_shared::types::ErrorResponse;

use crate::dto::auth_dto::RegisterRequest;
use crate::handlers::error_handler::handle_domain_error;
use crate::state::AppState;

use super::issue_for_identity;

/// Handler for POST /auth/register
///
/// Creates an account through the identity subsystem and logs the new
/// user straight in with a token pair.
///
/// # Errors
/// - 400 Bad Request: malformed email or short password
/// - 409 Conflict: email already registered
pub async fn register<R, I>(
    state: web::Data<AppState<R, I>>,
    request: web::Json<RegisterRequest>,
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
        .register(&request.email, &request.password)
        .await
    {
        Ok(identity) => issue_for_identity(&state.tokens, identity, &http_request).await,
        Err(error) => handle_domain_error(error),
    }
}
