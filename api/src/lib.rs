//! # Muse API
//!
//! HTTP surface of the Muse authentication service. Handlers stay thin:
//! they parse DTOs, capture request metadata, and delegate to the token
//! lifecycle service in `muse_core`.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use app::create_app;
pub use state::AppState;
