//! Configuration module
//!
//! Organized by concern:
//! - `auth` - JWT signing and token lifetime configuration
//! - `server` - HTTP server configuration

pub mod auth;
pub mod server;

pub use auth::JwtConfig;
pub use server::ServerConfig;
