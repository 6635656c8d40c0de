//! API route definitions

use axum::{
    middleware,
    routing::{get, put},
    Json, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    handlers::{data, health, items, profiles, ws},
    middleware::{access_control, logging_middleware},
    state::AppState,
};

/// Routes that require a loopback peer or the shared key
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Polling
        .route("/api/data/:profile_name", get(data::get_data))
        // Item management
        .route(
            "/api/items/:profile_name",
            get(items::get_items).post(items::add_item),
        )
        .route(
            "/api/items/:profile_name/:key",
            put(items::update_item).delete(items::delete_item),
        )
        // Profile management
        .route("/api/profiles", get(profiles::list_profiles))
        .route(
            "/api/profiles/:profile_name",
            get(profiles::get_profile)
                .put(profiles::save_profile)
                .delete(profiles::delete_profile),
        )
        .route_layer(middleware::from_fn_with_state(state, access_control))
}

/// Routes open to every client
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/ws", get(ws::ws_handler))
        .route("/", get(ws::ws_handler))
}

/// Combined router with shared layers and state
pub fn all_routes(state: AppState) -> Router {
    public_routes()
        .merge(api_routes(state.clone()))
        .layer(middleware::from_fn(logging_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        data::get_data,
        items::get_items,
        items::add_item,
        items::update_item,
        items::delete_item,
        profiles::list_profiles,
        profiles::get_profile,
        profiles::save_profile,
        profiles::delete_profile,
    ),
    components(schemas(
        crate::models::AddItemRequest,
        crate::models::UpdateItemRequest,
        crate::models::ItemsResponse,
        crate::models::MutationResponse,
        crate::models::SaveProfileRequest,
        crate::models::ProfilesResponse,
        crate::models::MessageResponse,
        crate::models::ErrorResponse,
        crate::models::HealthResponse,
    )),
    info(
        title = "vmixlink API",
        version = "1.0.0",
        description = "Profile data server for vMix title polling and live updates"
    )
)]
pub struct ApiDoc;
