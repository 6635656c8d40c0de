//! Whole-profile management endpoints, served through the command channel

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;
use vmixlink_format::items_from_json;

use super::parse_profile_name;
use crate::{
    error::{ApiError, ApiResult},
    models::{
        ErrorResponse, ItemsResponse, MessageResponse, MutationResponse, ProfilesResponse,
        SaveProfileRequest,
    },
    state::AppState,
};

/// List stored profiles
#[utoipa::path(
    get,
    path = "/api/profiles",
    responses(
        (status = 200, description = "Profile names, sorted", body = ProfilesResponse),
        (status = 500, description = "Data directory could not be read", body = ErrorResponse)
    )
)]
pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Json<ProfilesResponse>> {
    let profiles = state.commands.list_profiles().await?;
    Ok(Json(ProfilesResponse {
        profiles: profiles.into_iter().map(String::from).collect(),
    }))
}

/// Items of a profile for editing
#[utoipa::path(
    get,
    path = "/api/profiles/{profile_name}",
    params(("profile_name" = String, Path, description = "Profile name")),
    responses(
        (status = 200, description = "Items of the profile; empty when it does not exist", body = ItemsResponse),
        (status = 400, description = "Invalid profile name", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
) -> ApiResult<Json<ItemsResponse>> {
    let name = parse_profile_name(&profile_name)?;
    let items = state.commands.get_profile(name).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Replace every item of a profile
#[utoipa::path(
    put,
    path = "/api/profiles/{profile_name}",
    params(("profile_name" = String, Path, description = "Profile name")),
    request_body = SaveProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = MutationResponse),
        (status = 400, description = "Invalid profile name or items", body = ErrorResponse),
        (status = 500, description = "Profile could not be saved", body = ErrorResponse)
    )
)]
pub async fn save_profile(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let name = parse_profile_name(&profile_name)?;

    let required = || ApiError::BadRequest("Items are required".to_string());
    let Json(body) = body.map_err(|_| required())?;
    let items = items_from_json(body.get("items").ok_or_else(required)?)
        .map_err(|e| ApiError::BadRequest(e.detail()))?;

    let items = state.commands.save_profile(name, items).await?;
    Ok(Json(MutationResponse {
        message: "Profile saved successfully".to_string(),
        items,
    }))
}

/// Delete a profile
#[utoipa::path(
    delete,
    path = "/api/profiles/{profile_name}",
    params(("profile_name" = String, Path, description = "Profile name")),
    responses(
        (status = 200, description = "Profile deleted, or did not exist", body = MessageResponse),
        (status = 400, description = "Invalid profile name", body = ErrorResponse),
        (status = 500, description = "Profile could not be deleted", body = ErrorResponse)
    )
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let name = parse_profile_name(&profile_name)?;
    state.commands.delete_profile(name).await?;
    Ok(Json(MessageResponse {
        message: "Profile deleted successfully".to_string(),
    }))
}
