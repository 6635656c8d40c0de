//! API request and response models

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use vmixlink_store::Items;

/// Query parameters of a data poll
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DataQuery {
    /// `json` (default), `xml`, `text`, `plain` or `plaintext`
    pub format: Option<String>,
    /// Comma-separated keys to keep
    pub include: Option<String>,
    /// Comma-separated keys to drop
    pub exclude: Option<String>,
}

/// Add item request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddItemRequest {
    /// Item key
    pub key: String,
    /// String, number, boolean or null
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

/// Update item request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// String, number, boolean or null
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

/// Items of one profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemsResponse {
    #[schema(value_type = Object)]
    pub items: Items,
}

/// Result of an item or profile mutation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse {
    pub message: String,
    /// Items of the profile after the change
    #[schema(value_type = Object)]
    pub items: Items,
}

/// Whole-profile save request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveProfileRequest {
    #[schema(value_type = Object)]
    pub items: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfilesResponse {
    /// Stored profile names, sorted
    pub profiles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime: u64,
    /// Connected WebSocket subscribers
    pub subscribers: usize,
}
