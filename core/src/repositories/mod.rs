//! Repository interfaces and test doubles

pub mod token;

pub use token::{MockTokenRepository, TokenRepository};
