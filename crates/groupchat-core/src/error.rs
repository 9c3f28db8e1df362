use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ClientLifecycleState;

/// Broad error category used for user-facing message selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The server answered and explicitly refused the request (`error` field).
    Rejected,
    /// Authentication/authorization failure.
    Auth,
    /// Rate-limited by the server.
    RateLimited,
    /// Invalid input, unsupported state, or other configuration issue.
    Config,
    /// Server-side failure without an explicit error payload.
    Server,
    /// Request never produced a response (connect, timeout, DNS).
    Network,
    /// Response body could not be decoded.
    Serialization,
    /// Internal client bug or invariant break.
    Internal,
}

/// Stable client error payload emitted across the command/event boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ClientError {
    /// High-level error category.
    pub category: ErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message. For `Rejected` this is the server's text.
    pub message: String,
    /// HTTP status when the failure came from a response.
    pub status: Option<u16>,
}

impl ClientError {
    /// Construct a new client error.
    pub fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Server refused the request with its own error text.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Rejected, "server_rejected", message)
    }

    /// Attach the HTTP status the error was derived from.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: ClientLifecycleState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while client is in state {current:?}"),
        )
    }

    /// Whether the failure happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.category,
            ErrorCategory::Network | ErrorCategory::Serialization
        )
    }
}

/// Map HTTP status codes to client error categories.
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        408 | 429 => ErrorCategory::RateLimited,
        400..=499 => ErrorCategory::Config,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_status_categories() {
        assert_eq!(classify_http_status(401), ErrorCategory::Auth);
        assert_eq!(classify_http_status(429), ErrorCategory::RateLimited);
        assert_eq!(classify_http_status(404), ErrorCategory::Config);
        assert_eq!(classify_http_status(503), ErrorCategory::Server);
        assert_eq!(classify_http_status(700), ErrorCategory::Internal);
    }

    #[test]
    fn keeps_invalid_state_error_code_stable() {
        let err = ClientError::invalid_state(ClientLifecycleState::Cold, "open_chat");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(err.category, ErrorCategory::Internal);
    }

    #[test]
    fn only_network_and_decode_failures_count_as_transport() {
        assert!(ClientError::new(ErrorCategory::Network, "connect", "refused").is_transport());
        assert!(ClientError::new(ErrorCategory::Serialization, "decode", "bad").is_transport());
        assert!(!ClientError::rejected("Invalid passcode").is_transport());
        assert!(
            !ClientError::new(ErrorCategory::Server, "http_500", "boom")
                .with_status(500)
                .is_transport()
        );
    }
}
