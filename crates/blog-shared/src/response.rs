//! Response envelopes shared by every endpoint.

use serde::{Deserialize, Serialize};

/// Error body: `{ "success": false, "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Plain acknowledgement: `{ "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body() {
        let body = serde_json::to_string(&ErrorResponse::new("Failed to create post: boom")).unwrap();
        assert_eq!(body, r#"{"success":false,"message":"Failed to create post: boom"}"#);
    }
}
