//! API response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unified error response structure for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl ToString, message: impl ToString) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("INVALID_TOKEN", "Invalid or expired token");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "INVALID_TOKEN");
        assert_eq!(json["message"], "Invalid or expired token");
    }
}
