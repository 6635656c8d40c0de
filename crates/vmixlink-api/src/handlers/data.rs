//! Polling endpoint used by vMix

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use super::parse_profile_name;
use crate::{
    error::ApiResult,
    models::{DataQuery, ErrorResponse},
    service::DataRequest,
    state::AppState,
};

const CACHE_CONTROL: &str = "public, max-age=60";

/// Formatted profile data
#[utoipa::path(
    get,
    path = "/api/data/{profile_name}",
    params(
        ("profile_name" = String, Path, description = "Profile name"),
        DataQuery
    ),
    responses(
        (status = 200, description = "Profile rendered in the requested format; empty document when the profile does not exist"),
        (status = 400, description = "Invalid profile name", body = ErrorResponse),
        (status = 403, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 500, description = "Profile could not be read", body = ErrorResponse)
    )
)]
pub async fn get_data(
    State(state): State<AppState>,
    Path(profile_name): Path<String>,
    Query(query): Query<DataQuery>,
) -> ApiResult<Response> {
    let name = parse_profile_name(&profile_name)?;
    let request = DataRequest {
        format: query.format,
        include: query.include,
        exclude: query.exclude,
    };

    let rendered = state.service.get_data(&name, &request).await?;

    let mut response = (
        [
            (header::CONTENT_TYPE, rendered.content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        rendered.body.to_vec(),
    )
        .into_response();

    if let Some(etag) = rendered.etag {
        if let Ok(value) = HeaderValue::from_str(&etag) {
            response.headers_mut().insert(header::ETAG, value);
        }
    }
    Ok(response)
}
