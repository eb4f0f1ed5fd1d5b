use actix_web::{web, HttpResponse};
use uuid::Uuid;

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_shared::types::ErrorResponse;

use crate::dto::auth_dto::SessionResponse;
use crate::handlers::error_handler::handle_domain_error;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

/// Handler for GET /auth/sessions (bearer-authenticated)
///
/// Lists the caller's active sessions, newest first. Token values are
/// never included.
pub async fn list_sessions<R, I>(
    state: web::Data<AppState<R, I>>,
    auth: AuthContext,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    match state.tokens.list_active_sessions(auth.user_id).await {
        Ok(sessions) => HttpResponse::Ok().json(
            sessions
                .into_iter()
                .map(SessionResponse::from)
                .collect::<Vec<_>>(),
        ),
        Err(error) => handle_domain_error(error),
    }
}

/// Handler for DELETE /auth/sessions/{session_id} (bearer-authenticated)
///
/// Revokes one session if it is active and owned by the caller,
/// answering 204. Unknown ids and sessions owned by other users both
/// answer 404, so session ids of other accounts cannot be probed.
pub async fn revoke_session<R, I>(
    state: web::Data<AppState<R, I>>,
    auth: AuthContext,
    session_id: web::Path<Uuid>,
) -> HttpResponse
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    match state
        .tokens
        .revoke_session(auth.user_id, session_id.into_inner())
        .await
    {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => {
            HttpResponse::NotFound().json(ErrorResponse::new("NOT_FOUND", "Session not found"))
        }
        Err(error) => handle_domain_error(error),
    }
}
