//! Wire message types exchanged with devices.
//!
//! Every frame is a JSON object discriminated by `messageType`:
//!
//! ```json
//! {"messageType": "register", "requestId": "1", "deviceSetId": "A",
//!  "deviceDefinitions": [{"id": "lamp1", "type": "action.devices.types.LIGHT"}]}
//! {"messageType": "execute", "requestId": "…", "device": {"id": "lamp1"},
//!  "executions": [{"command": "action.devices.commands.OnOff", "params": {"on": true}}]}
//! {"messageType": "response", "requestId": "1", "requestMessageType": "register",
//!  "success": true}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceDefinition, DeviceSetId};

/// Discriminator values of `messageType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Device → server catalogue announcement.
    Register,
    /// Server → device command.
    Execute,
    /// Reply to a previous request, either direction.
    Response,
}

impl MessageKind {
    /// Returns the wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Execute => "execute",
            Self::Response => "response",
        }
    }

    /// Parses the wire spelling.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "register" => Some(Self::Register),
            "execute" => Some(Self::Execute),
            "response" => Some(Self::Response),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device-set announcing (or refreshing) its catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMessage {
    /// Device-chosen request id, echoed in the reply.
    pub request_id: String,
    /// Device-set name.
    pub device_set_id: DeviceSetId,
    /// Devices in the set, in announcement order.
    pub device_definitions: Vec<DeviceDefinition>,
}

/// Device targeted by an execute frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTarget {
    /// Device id as announced in the catalogue.
    pub id: String,
    /// Opaque per-device data the fulfillment layer passed along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

impl DeviceTarget {
    /// Targets a device by id only.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            custom_data: None,
        }
    }
}

/// One command in an execute frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Command name, e.g. `action.devices.commands.OnOff`.
    pub command: String,
    /// Command parameters.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// A command list for a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteMessage {
    /// Server-generated request id. Unique within a process run only.
    pub request_id: String,
    /// Target device.
    pub device: DeviceTarget,
    /// Commands, applied in order.
    pub executions: Vec<Execution>,
}

/// Reply to a previous request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    /// Id of the request being answered.
    pub request_id: String,
    /// Kind of the request being answered.
    pub request_message_type: MessageKind,
    /// Whether the request was handled.
    pub success: bool,
    /// Free-form details, typically on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

/// Any frame on a device connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "lowercase")]
pub enum WireMessage {
    /// See [`RegisterMessage`].
    Register(RegisterMessage),
    /// See [`ExecuteMessage`].
    Execute(ExecuteMessage),
    /// See [`ResponseMessage`].
    Response(ResponseMessage),
}

impl WireMessage {
    /// Builds an execute frame with a fresh request id.
    #[must_use]
    pub fn execute(device: DeviceTarget, executions: Vec<Execution>) -> Self {
        Self::Execute(ExecuteMessage {
            request_id: uuid::Uuid::new_v4().to_string(),
            device,
            executions,
        })
    }

    /// Builds the reply to `request`.
    #[must_use]
    pub fn response_to(request: &Self, success: bool, diagnostics: Option<serde_json::Value>) -> Self {
        Self::Response(ResponseMessage {
            request_id: request.request_id().to_string(),
            request_message_type: request.kind(),
            success,
            diagnostics,
        })
    }

    /// Returns the frame's discriminator.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Register(_) => MessageKind::Register,
            Self::Execute(_) => MessageKind::Execute,
            Self::Response(_) => MessageKind::Response,
        }
    }

    /// Returns the frame's request id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Register(m) => &m.request_id,
            Self::Execute(m) => &m.request_id,
            Self::Response(m) => &m.request_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn execute_ids_are_fresh() {
        let a = WireMessage::execute(DeviceTarget::new("lamp1"), Vec::new());
        let b = WireMessage::execute(DeviceTarget::new("lamp1"), Vec::new());
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(a.kind(), MessageKind::Execute);
    }

    #[test]
    fn response_echoes_request() {
        let register = WireMessage::Register(RegisterMessage {
            request_id: "req-7".to_string(),
            device_set_id: DeviceSetId::new("A"),
            device_definitions: vec![DeviceDefinition::new("lamp1")],
        });
        let WireMessage::Response(reply) = WireMessage::response_to(&register, true, None) else {
            panic!("expected a response");
        };
        assert_eq!(reply.request_id, "req-7");
        assert_eq!(reply.request_message_type, MessageKind::Register);
        assert!(reply.success);
    }

    #[test]
    fn response_wire_shape() {
        let reply = WireMessage::Response(ResponseMessage {
            request_id: "1".to_string(),
            request_message_type: MessageKind::Register,
            success: true,
            diagnostics: None,
        });
        let Ok(value) = serde_json::to_value(&reply) else {
            panic!("encode failed");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "messageType": "response",
                "requestId": "1",
                "requestMessageType": "register",
                "success": true
            })
        );
    }

    #[test]
    fn execute_wire_shape() {
        let mut params = serde_json::Map::new();
        params.insert("on".to_string(), serde_json::Value::Bool(true));
        let msg = WireMessage::Execute(ExecuteMessage {
            request_id: "x".to_string(),
            device: DeviceTarget::new("lamp1"),
            executions: vec![Execution {
                command: "action.devices.commands.OnOff".to_string(),
                params,
            }],
        });
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("encode failed");
        };
        assert_eq!(value["messageType"], "execute");
        assert_eq!(value["device"]["id"], "lamp1");
        assert!(value["device"].get("customData").is_none());
        assert_eq!(value["executions"][0]["params"]["on"], true);
    }

    #[test]
    fn kind_parse_matches_display() {
        for kind in [MessageKind::Register, MessageKind::Execute, MessageKind::Response] {
            assert_eq!(MessageKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(MessageKind::parse("subscribe"), None);
    }
}
