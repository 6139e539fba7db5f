//! Device-set diagnostics: list and get.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{DeviceSetDto, DeviceSetListResponse};
use crate::app_state::AppState;
use crate::domain::DeviceSetId;
use crate::error::{BridgeError, ErrorResponse};

/// `GET /device-sets`: List every known device-set.
#[utoipa::path(
    get,
    path = "/api/v1/device-sets",
    tag = "Device sets",
    summary = "List device sets",
    description = "Returns every device-set the registry knows, online or not, in first-registration order.",
    responses(
        (status = 200, description = "Device-set list", body = DeviceSetListResponse),
    )
)]
pub async fn list_device_sets(State(state): State<AppState>) -> Json<DeviceSetListResponse> {
    let device_sets: Vec<DeviceSetDto> = state
        .registry
        .device_sets()
        .await
        .into_iter()
        .map(DeviceSetDto::from)
        .collect();
    let online = device_sets.iter().filter(|s| s.online).count();

    Json(DeviceSetListResponse {
        total: device_sets.len(),
        online,
        device_sets,
    })
}

/// `GET /device-sets/{id}`: Get one device-set.
///
/// # Errors
///
/// Returns [`BridgeError::DeviceSetNotFound`] if the id is unknown.
#[utoipa::path(
    get,
    path = "/api/v1/device-sets/{id}",
    tag = "Device sets",
    summary = "Get device set",
    params(("id" = String, Path, description = "Device-set name")),
    responses(
        (status = 200, description = "Device-set", body = DeviceSetDto),
        (status = 404, description = "Unknown device-set", body = ErrorResponse),
    )
)]
pub async fn get_device_set(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceSetDto>, BridgeError> {
    state
        .registry
        .device_set(&DeviceSetId::new(id.as_str()))
        .await
        .map(|set| Json(DeviceSetDto::from(set)))
        .ok_or(BridgeError::DeviceSetNotFound(id))
}

/// Device-set routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/device-sets", get(list_device_sets))
        .route("/device-sets/{id}", get(get_device_set))
}
