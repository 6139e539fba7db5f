//! Smart-home fulfillment endpoint.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;

use crate::api::dto::{
    ExecuteRequestPayload, ExecuteResponsePayload, FulfillmentPayload, FulfillmentRequest,
    FulfillmentResponse, INTENT_DISCONNECT, INTENT_EXECUTE, INTENT_QUERY, INTENT_SYNC,
    QueryRequestPayload, QueryResponsePayload, SyncResponsePayload,
};
use crate::app_state::AppState;
use crate::error::{BridgeError, ErrorResponse};

/// `POST /fulfillment`: Answer a SYNC, QUERY, EXECUTE or DISCONNECT intent.
///
/// # Errors
///
/// Returns [`BridgeError::Unauthorized`] / [`BridgeError::Forbidden`] when
/// the gate rejects the caller, [`BridgeError::InvalidRequest`] for a
/// malformed envelope, and [`BridgeError::UnsupportedIntent`] for any other
/// intent.
#[utoipa::path(
    post,
    path = "/fulfillment",
    tag = "Fulfillment",
    summary = "Smart-home fulfillment",
    description = "Handles the first intent of the envelope. EXECUTE is fire-and-forget: SUCCESS means the command was queued on the device's connection.",
    request_body = FulfillmentRequest,
    responses(
        (status = 200, description = "Intent handled", body = FulfillmentResponse),
        (status = 400, description = "Malformed envelope or unknown intent", body = ErrorResponse),
        (status = 401, description = "Missing or unknown bearer token", body = ErrorResponse),
        (status = 403, description = "Token lacks the required scope", body = ErrorResponse),
    )
)]
pub async fn fulfillment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<FulfillmentRequest>, JsonRejection>,
) -> Result<Json<FulfillmentResponse>, BridgeError> {
    state.gate.authorize(&headers).await?;

    let Json(request) = body.map_err(|e| BridgeError::InvalidRequest(e.body_text()))?;
    let Some(input) = request.inputs.into_iter().next() else {
        return Err(BridgeError::InvalidRequest("no inputs".to_string()));
    };
    tracing::debug!(request_id = %request.request_id, intent = %input.intent, "fulfillment");

    let fulfillment = &state.fulfillment;
    let payload = match input.intent.as_str() {
        INTENT_SYNC => {
            let sync = fulfillment.sync().await;
            Some(FulfillmentPayload::Sync(SyncResponsePayload {
                agent_user_id: sync.agent_user_id,
                devices: sync.devices,
            }))
        }
        INTENT_QUERY => {
            let query: QueryRequestPayload = if input.payload.is_null() {
                QueryRequestPayload::default()
            } else {
                parse_payload(input.payload)?
            };
            let ids: Vec<String> = query.devices.into_iter().map(|d| d.id).collect();
            Some(FulfillmentPayload::Query(QueryResponsePayload {
                devices: fulfillment.query(&ids).await,
            }))
        }
        INTENT_EXECUTE => {
            let execute: ExecuteRequestPayload = parse_payload(input.payload)?;
            let commands = execute
                .commands
                .into_iter()
                .map(|c| (c.devices, c.execution))
                .collect();
            Some(FulfillmentPayload::Execute(ExecuteResponsePayload {
                commands: fulfillment.execute_all(commands).await,
            }))
        }
        INTENT_DISCONNECT => {
            tracing::info!(agent_user_id = fulfillment.agent_user_id(), "account unlinked");
            None
        }
        other => return Err(BridgeError::UnsupportedIntent(other.to_string())),
    };

    Ok(Json(FulfillmentResponse {
        request_id: request.request_id,
        payload,
    }))
}

fn parse_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, BridgeError> {
    serde_json::from_value(payload).map_err(|e| BridgeError::InvalidRequest(e.to_string()))
}

/// Fulfillment routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/fulfillment", post(fulfillment_handler))
}
