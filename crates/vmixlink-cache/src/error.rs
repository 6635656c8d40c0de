//! Cache-related error types

use thiserror::Error;

/// Cache operation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache TTL must be greater than zero")]
    ZeroTtl,
}

pub type Result<T> = std::result::Result<T, CacheError>;
