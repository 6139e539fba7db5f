//! Axum WebSocket upgrade handler for device connections.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /device-manager`: Authorize, then upgrade to a device WebSocket.
///
/// The gate runs before the upgrade is looked at, so a rejected caller gets
/// a bare `401` whatever else is wrong with the request.
pub async fn device_ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Err(rejection) = state.gate.authorize(&headers).await {
        tracing::info!(reason = %rejection, "device upgrade rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let device_service = Arc::clone(&state.device_service);
    let connections = Arc::clone(&state.connections);
    ws.on_upgrade(move |socket| run_connection(socket, device_service, connections))
}
