//! Shared application state

use muse_core::repositories::TokenRepository;
use muse_core::services::identity::IdentityVerifier;
use muse_core::services::token::TokenService;

/// Dependencies shared across request handlers
///
/// Generic over the repository and identity implementations so tests can
/// run the full HTTP stack against in-memory doubles.
pub struct AppState<R, I>
where
    R: TokenRepository + 'static,
    I: IdentityVerifier + 'static,
{
    /// Token lifecycle service
    pub tokens: TokenService<R>,

    /// External identity oracle for credential checks
    pub identity: I,
}
