//! Application factory
//!
//! Builds the Actix application with all routes and middleware wired.
//! Generic over the repository and identity implementations so the
//! integration tests run the same factory against in-memory doubles.

use actix_web::{middleware::Logger, web, App, HttpResponse};

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_shared::types::ErrorResponse;

use crate::middleware::{auth::JwtAuth, cors::create_cors};
use crate::routes::auth::{
    google::google, login::login, logout::logout, logout_all::logout_all, refresh::refresh,
    register::register, sessions::list_sessions, sessions::revoke_session,
};
use crate::state::AppState;

/// Create and configure the application with all dependencies
pub fn create_app<R, I>(
    app_state: web::Data<AppState<R, I>>,
    jwt_secret: String,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    App::new()
        .app_data(app_state)
        .wrap(Logger::default())
        .wrap(create_cors())
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(login::<R, I>))
                .route("/register", web::post().to(register::<R, I>))
                .route("/google", web::post().to(google::<R, I>))
                .route("/refresh", web::post().to(refresh::<R, I>))
                .route("/logout", web::post().to(logout::<R, I>))
                // Bearer-protected endpoints live in a nested scope so
                // the auth middleware only guards these routes.
                .service(
                    web::scope("")
                        .wrap(JwtAuth::with_secret(jwt_secret))
                        .route("/logout-all", web::post().to(logout_all::<R, I>))
                        .route("/sessions", web::get().to(list_sessions::<R, I>))
                        .route(
                            "/sessions/{session_id}",
                            web::delete().to(revoke_session::<R, I>),
                        ),
                ),
        )
        .default_service(web::route().to(not_found))
}

/// Health check endpoint handler
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "muse-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Default 404 handler
async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new(
        "NOT_FOUND",
        "The requested resource was not found",
    ))
}
