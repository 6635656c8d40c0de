//! Store error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store errors
///
/// A missing profile file is not an error; reads report it as `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid profile name: {name}")]
    InvalidProfileName { name: String },

    #[error("Invalid value for key '{key}': must be a string, number, boolean, or null")]
    InvalidValue { key: String },

    #[error("Permission denied at {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left on device while writing {}", .path.display())]
    OutOfSpace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid profile data format in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize profile data: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Coarse classification used by callers to pick an operator-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input; never reached storage
    Validation,
    /// The process lacks permission on the data directory or file
    Permission,
    /// The disk (or quota) is full
    Space,
    /// The stored file could not be parsed
    Format,
    /// Any other I/O failure
    Io,
}

impl StoreError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied { path, source },
            io::ErrorKind::StorageFull => StoreError::OutOfSpace { path, source },
            _ => StoreError::Io { path, source },
        }
    }

    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::InvalidProfileName { .. } | StoreError::InvalidValue { .. } => {
                ErrorCategory::Validation
            }
            StoreError::PermissionDenied { .. } => ErrorCategory::Permission,
            StoreError::OutOfSpace { .. } => ErrorCategory::Space,
            StoreError::Parse { .. } => ErrorCategory::Format,
            StoreError::Io { .. } | StoreError::Serialize(_) => ErrorCategory::Io,
        }
    }
}
