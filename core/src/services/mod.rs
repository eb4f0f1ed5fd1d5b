//! Business services

pub mod identity;
pub mod token;

pub use identity::{IdentityVerifier, MockIdentityVerifier, UserDirectory, VerifiedIdentity};
pub use token::{Clock, ManualClock, SystemClock, TokenService, TokenServiceConfig};
