//! Token lifecycle service
//!
//! This module is the sole authority over refresh tokens:
//! - issuance of access/refresh token pairs
//! - refresh with mandatory rotation and reuse detection
//! - revocation (single session, per user, by session id)
//! - active session enumeration
//! - stateless access token verification

mod clock;
mod config;
mod service;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TokenServiceConfig;
pub use service::{RefreshGrant, TokenService};
