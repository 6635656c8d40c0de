//! Client error types

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network request failed
    #[error("Network request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered with an error body
    #[error("HTTP {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    BuildError(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The subscriber gave up reconnecting
    #[error("Reconnect limit exceeded after {attempts} attempts")]
    ReconnectLimitExceeded { attempts: u32 },
}

impl ClientError {
    /// Status code of an API error, if any
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::RequestFailed(e) => e.status(),
            _ => None,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            ClientError::WebSocket(_) => true,
            ClientError::Api { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
