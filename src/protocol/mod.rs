//! Device wire protocol: the three frame kinds and their JSON codec.
//!
//! Frames travel as WebSocket text messages. A frame that fails to decode
//! is logged and dropped by the connection task; the connection stays up.

pub mod codec;
pub mod messages;

pub use codec::{CodecError, decode, encode};
pub use messages::{
    DeviceTarget, ExecuteMessage, Execution, MessageKind, RegisterMessage, ResponseMessage,
    WireMessage,
};
