//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! Diagnostics endpoints are mounted under `/api/v1`; `/health` and
//! `/fulfillment` live at the root next to the device WebSocket.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::device_ws_handler;

/// OpenAPI document for the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "device-bridge",
        description = "Smart-home fulfillment bridge for long-lived device connections"
    ),
    paths(
        handlers::system::health_handler,
        handlers::device_sets::list_device_sets,
        handlers::device_sets::get_device_set,
        handlers::fulfillment::fulfillment_handler,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        dto::DeviceSetDto,
        dto::DeviceSetListResponse,
        dto::FulfillmentRequest,
        dto::FulfillmentInput,
        dto::FulfillmentResponse,
        dto::FulfillmentPayload,
        dto::SyncResponsePayload,
        dto::QueryResponsePayload,
        dto::ExecuteResponsePayload,
        crate::service::CommandResult,
        crate::service::CommandStatus,
        crate::service::DeviceQueryState,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Device sets", description = "Registry diagnostics"),
        (name = "Fulfillment", description = "Smart-home intents"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(handlers::fulfillment::routes())
        .merge(docs_router())
}

/// Builds the full application: REST, fulfillment, and the device
/// WebSocket at the configured path.
pub fn build_app(state: AppState) -> Router {
    let ws_path = state.config.device_ws_path.clone();
    Router::new()
        .merge(build_router())
        .route(&ws_path, get(device_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}
