//! Client-side error types

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to callers of the coordinator.
///
/// Cloneable so a single refresh outcome can be broadcast to every
/// caller waiting on the shared in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The session can no longer be refreshed. The caller should send
    /// the user back to login.
    #[error("Session expired. Please log in again")]
    SessionExpired,

    /// The refresh call failed for a reason other than rejection, such
    /// as a network failure.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The underlying request could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
