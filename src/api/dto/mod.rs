//! Data Transfer Objects for REST request/response serialization.
//!
//! The fulfillment DTOs follow the smart-home intent envelope
//! (`requestId` / `inputs` / `payload`, camelCase); the diagnostics DTOs use
//! snake_case like the rest of the API.

pub mod device_set_dto;
pub mod fulfillment_dto;

pub use device_set_dto::*;
pub use fulfillment_dto::*;
