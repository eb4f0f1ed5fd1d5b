use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_shared::types::ErrorResponse;

use crate::dto::auth_dto::GoogleAuthRequest;
use crate::handlers::error_handler::handle_domain_error;
use crate::state::AppState;

use super::issue_for_identity;

/// Handler for POST /auth/google
///
/// Exchanges a Google ID token for a Muse token pair. Token
/// verification happens inside the identity subsystem.
pub async fn google<R, I>(
    state: web::Data<AppState<R, I>>,
    request: web::Json<GoogleAuthRequest>,
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

    match state.identity.verify_google(&request.id_token).await {
        Ok(identity) => issue_for_identity(&state.tokens, identity, &http_request).await,
        Err(error) => handle_domain_error(error),
    }
}
