//! Client-local token persistence
//!
//! The coordinator reads and writes tokens through the `TokenStore`
//! trait so browser local storage, the OS keychain, or an in-memory map
//! can back it interchangeably.

use std::collections::HashMap;
use std::sync::Mutex;

/// Storage keys used by the coordinator.
pub mod keys {
    /// Canonical access token key.
    pub const ACCESS_TOKEN: &str = "auth.accessToken";
    /// Refresh token key.
    pub const REFRESH_TOKEN: &str = "auth.refreshToken";
    /// Estimated access token expiry, RFC 3339.
    pub const EXPIRES_AT: &str = "auth.expiresAt";
    /// Deprecated alias of the access token, kept in sync for readers
    /// that predate the `auth.`-prefixed keys. Remove once no consumer
    /// reads it.
    pub const LEGACY_TOKEN: &str = "token";
}

/// Key/value persistence for client tokens.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store used in tests and short-lived tools.
#[derive(Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .map(|values| values.get(key).cloned())
            .unwrap_or(None)
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}
