use actix_web::{web, HttpResponse};
use tracing::info;

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;

use crate::dto::auth_dto::LogoutResponse;
use crate::handlers::error_handler::handle_domain_error;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

/// Handler for POST /auth/logout-all (bearer-authenticated)
///
/// Revokes every active session owned by the caller. Doubles as the
/// kill switch after a suspected token theft.
pub async fn logout_all<R, I>(
    state: web::Data<AppState<R, I>>,
    auth: AuthContext,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    match state.tokens.revoke_all(auth.user_id).await {
        Ok(count) => {
            info!(user_id = %auth.user_id, revoked = count, "logout-all");
            HttpResponse::Ok().json(LogoutResponse { success: true })
        }
        Err(error) => handle_domain_error(error),
    }
}
