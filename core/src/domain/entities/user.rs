//! User reference entity
//!
//! The user record itself is owned by the identity subsystem; the token
//! lifecycle only ever references it by id and email.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user reference carried in token responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Email address
    pub email: String,
}

impl User {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
