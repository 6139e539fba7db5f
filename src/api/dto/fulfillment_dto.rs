//! Smart-home intent envelope for `POST /fulfillment`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DeviceDefinition;
use crate::protocol::{DeviceTarget, Execution};
use crate::service::{CommandResult, DeviceQueryState};

/// Intent name for catalogue requests.
pub const INTENT_SYNC: &str = "action.devices.SYNC";
/// Intent name for state requests.
pub const INTENT_QUERY: &str = "action.devices.QUERY";
/// Intent name for command requests.
pub const INTENT_EXECUTE: &str = "action.devices.EXECUTE";
/// Intent name for account unlinking.
pub const INTENT_DISCONNECT: &str = "action.devices.DISCONNECT";

/// Request body for `POST /fulfillment`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRequest {
    /// Cloud-chosen request id, echoed in the response.
    pub request_id: String,
    /// Intents; only the first is acted upon.
    pub inputs: Vec<FulfillmentInput>,
}

/// One intent in a [`FulfillmentRequest`].
#[derive(Debug, Deserialize, ToSchema)]
pub struct FulfillmentInput {
    /// Intent name, e.g. `action.devices.EXECUTE`.
    pub intent: String,
    /// Intent-specific payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// QUERY request payload.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequestPayload {
    /// Devices to report on; empty means all.
    #[serde(default)]
    pub devices: Vec<DeviceTarget>,
}

/// EXECUTE request payload.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequestPayload {
    /// Command groups.
    pub commands: Vec<ExecuteCommand>,
}

/// One command group: the same executions for several devices.
#[derive(Debug, Deserialize)]
pub struct ExecuteCommand {
    /// Target devices.
    pub devices: Vec<DeviceTarget>,
    /// Executions applied to each device, in order.
    pub execution: Vec<Execution>,
}

/// Response body for `POST /fulfillment`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResponse {
    /// Request id echoed from the request.
    pub request_id: String,
    /// Intent-specific answer. Absent for DISCONNECT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<FulfillmentPayload>,
}

/// Intent-specific response payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FulfillmentPayload {
    /// SYNC answer.
    Sync(SyncResponsePayload),
    /// QUERY answer.
    Query(QueryResponsePayload),
    /// EXECUTE answer.
    Execute(ExecuteResponsePayload),
}

/// SYNC response payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponsePayload {
    /// Agent user the catalogue belongs to.
    pub agent_user_id: String,
    /// Every known device definition.
    #[schema(value_type = Vec<Object>)]
    pub devices: Vec<DeviceDefinition>,
}

/// QUERY response payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponsePayload {
    /// Per-device state keyed by device id.
    pub devices: BTreeMap<String, DeviceQueryState>,
}

/// EXECUTE response payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecuteResponsePayload {
    /// One result per targeted device.
    pub commands: Vec<CommandResult>,
}
