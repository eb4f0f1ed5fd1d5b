//! Client-side companion to the Muse auth API.
//!
//! Caches the access/refresh token pair, refreshes proactively before
//! expiry, and serializes concurrent refresh attempts so a burst of
//! requests triggers at most one network refresh call.

pub mod coordinator;
pub mod error;
pub mod storage;
pub mod transport;

pub use coordinator::{CachedTokens, TokenCoordinator};
pub use error::ClientError;
pub use storage::{MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, ApiResponse, AuthTransport, HttpTransport, TokenGrant, TransportError};
