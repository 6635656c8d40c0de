//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use vmixlink_cache::CacheError;
use vmixlink_config::ConfigError;
use vmixlink_format::FormatError;
use vmixlink_store::{ErrorCategory, StoreError};

/// Errors surfaced to API callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Forbidden: Invalid API key")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Loading a profile failed
    #[error("Failed to read profile: {0}")]
    Read(#[source] StoreError),

    /// Persisting a profile failed
    #[error("Failed to save profile: {0}")]
    Save(#[source] StoreError),

    #[error("Failed to render profile: {0}")]
    Render(#[from] FormatError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_profile_name() -> Self {
        ApiError::BadRequest("Invalid profile name".to_string())
    }

    pub fn profile_not_found() -> Self {
        ApiError::NotFound("Profile not found".to_string())
    }

    pub fn key_not_found() -> Self {
        ApiError::NotFound("Key not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Read(e) | ApiError::Save(e) if e.category() == ErrorCategory::Validation => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Read(_) | ApiError::Save(_) | ApiError::Render(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message placed in the `error` field of the response body
    ///
    /// Storage failures get a category message so operators can tell
    /// permission problems from a full disk without reading logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => message.clone(),
            ApiError::Forbidden => self.to_string(),
            ApiError::Read(e) => store_message(e, "Failed to read profile data"),
            ApiError::Save(e) => store_message(e, "Failed to save profile data"),
            ApiError::Render(_) => "Failed to render profile data".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

fn store_message(e: &StoreError, fallback: &str) -> String {
    match (e, e.category()) {
        (StoreError::InvalidProfileName { .. }, _) => "Invalid profile name".to_string(),
        (_, ErrorCategory::Validation) => e.to_string(),
        (_, ErrorCategory::Permission) => "Permission denied while accessing profile data".to_string(),
        (_, ErrorCategory::Space) => "Insufficient disk space to save profile data".to_string(),
        (_, ErrorCategory::Format) => "Invalid profile data format".to_string(),
        (_, ErrorCategory::Io) => fallback.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures while starting the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid server configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open profile store: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid cache settings: {0}")]
    Cache(#[from] CacheError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
