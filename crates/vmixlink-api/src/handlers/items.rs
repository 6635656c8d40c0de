//! Item endpoints used by the management UI

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use vmixlink_store::Scalar;

use super::parse_profile_name;
use crate::{
    error::{ApiError, ApiResult},
    models::{AddItemRequest, ErrorResponse, ItemsResponse, MutationResponse, UpdateItemRequest},
    state::AppState,
};

/// Items of a profile
#[utoipa::path(
    get,
    path = "/api/items/{profile_name}",
    params(("profile_name" = String, Path, description = "Profile name")),
    responses(
        (status = 200, description = "Items of the profile; empty when it does not exist", body = ItemsResponse),
        (status = 400, description = "Invalid profile name", body = ErrorResponse),
        (status = 500, description = "Profile could not be read", body = ErrorResponse)
    )
)]
pub async fn get_items(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
) -> ApiResult<Json<ItemsResponse>> {
    let name = parse_profile_name(&profile_name)?;
    let items = state.service.get_items(&name).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Add an item
#[utoipa::path(
    post,
    path = "/api/items/{profile_name}",
    params(("profile_name" = String, Path, description = "Profile name")),
    request_body = AddItemRequest,
    responses(
        (status = 201, description = "Item added", body = MutationResponse),
        (status = 400, description = "Invalid profile name, key or value", body = ErrorResponse),
        (status = 409, description = "Key already exists", body = ErrorResponse),
        (status = 500, description = "Profile could not be read or saved", body = ErrorResponse)
    )
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MutationResponse>)> {
    let name = parse_profile_name(&profile_name)?;

    let required = || ApiError::BadRequest("Key and value are required".to_string());
    let Json(body) = body.map_err(|_| required())?;
    let key = body
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .ok_or_else(required)?
        .to_string();
    let value = scalar(&key, body.get("value").ok_or_else(required)?)?;

    let items = state.service.add_item(&name, key, value).await?;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Item added successfully".to_string(),
            items,
        }),
    ))
}

/// Update an existing item
#[utoipa::path(
    put,
    path = "/api/items/{profile_name}/{key}",
    params(
        ("profile_name" = String, Path, description = "Profile name"),
        ("key" = String, Path, description = "Item key")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = MutationResponse),
        (status = 400, description = "Invalid profile name or value", body = ErrorResponse),
        (status = 404, description = "Profile or key not found", body = ErrorResponse),
        (status = 500, description = "Profile could not be read or saved", body = ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path((profile_name, key)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MutationResponse>> {
    let name = parse_profile_name(&profile_name)?;

    let required = || ApiError::BadRequest("Value is required".to_string());
    let Json(body) = body.map_err(|_| required())?;
    let value = scalar(&key, body.get("value").ok_or_else(required)?)?;

    let items = state.service.update_item(&name, &key, value).await?;
    Ok(Json(MutationResponse {
        message: "Item updated successfully".to_string(),
        items,
    }))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/api/items/{profile_name}/{key}",
    params(
        ("profile_name" = String, Path, description = "Profile name"),
        ("key" = String, Path, description = "Item key")
    ),
    responses(
        (status = 200, description = "Item deleted", body = MutationResponse),
        (status = 400, description = "Invalid profile name", body = ErrorResponse),
        (status = 404, description = "Profile or key not found", body = ErrorResponse),
        (status = 500, description = "Profile could not be read or saved", body = ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path((profile_name, key)): Path<(String, String)>,
) -> ApiResult<Json<MutationResponse>> {
    let name = parse_profile_name(&profile_name)?;
    let items = state.service.delete_item(&name, &key).await?;
    Ok(Json(MutationResponse {
        message: "Item deleted successfully".to_string(),
        items,
    }))
}

fn scalar(key: &str, value: &Value) -> ApiResult<Scalar> {
    Scalar::from_json(key, value).map_err(|_| {
        ApiError::BadRequest(format!(
            "Object value for key '{key}' must be a string, number, boolean, or null"
        ))
    })
}
