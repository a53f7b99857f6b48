//! Client error types
//!
//! Every failure at the network boundary ends up as a [`ClientError`]; views
//! turn it into a screen-local message with [`ClientError::user_message`]
//! instead of propagating it further.

use thiserror::Error;

use crate::validation::FieldErrors;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (network unreachable, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not JSON
    #[error("Unexpected response (not JSON): {content_type}")]
    NotJson { content_type: String },

    /// Application-level failure (`status` not success)
    #[error("API error: {}", .0.as_deref().unwrap_or("request failed"))]
    Api(Option<String>),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No session, or the session ended while the request was in flight
    #[error("Authentication required")]
    Unauthorized,

    /// Role does not allow the operation
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Form validation failed; nothing was sent
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Push notification delivery
    #[error("Push error: {0}")]
    Push(String),
}

impl ClientError {
    /// Message shown on the screen that issued the call
    ///
    /// Application errors surface the server's message; every other failure
    /// uses the caller's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api(Some(message)) => message.clone(),
            ClientError::Validation(errors) => errors.to_string(),
            ClientError::Forbidden(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Transport-level failure (as opposed to an application-level one)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_) | ClientError::Status { .. } | ClientError::NotJson { .. }
        )
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
