//! Rendering and validation errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    /// The input is not a flat mapping (or list of mappings) of scalars
    #[error("Data validation failed: {message}")]
    Validation { message: String },

    #[error("JSON rendering failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML rendering failed: {message}")]
    Xml { message: String },
}

impl FormatError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        FormatError::Validation {
            message: message.into(),
        }
    }

    /// Message of a validation error without the generic prefix
    pub fn detail(&self) -> String {
        match self {
            FormatError::Validation { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
