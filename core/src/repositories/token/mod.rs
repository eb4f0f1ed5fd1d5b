//! Refresh token persistence interface

mod mock;
#[allow(clippy::module_inception)]
mod r#trait;

pub use mock::MockTokenRepository;
pub use r#trait::TokenRepository;
