//! API route handlers

pub mod data;
pub mod health;
pub mod items;
pub mod profiles;
pub mod ws;

use vmixlink_store::ProfileName;

use crate::error::{ApiError, ApiResult};

/// Validate a profile name taken from the path
pub(crate) fn parse_profile_name(raw: &str) -> ApiResult<ProfileName> {
    ProfileName::new(raw).map_err(|_| {
        tracing::warn!("Invalid profile name: {}", raw);
        ApiError::invalid_profile_name()
    })
}
