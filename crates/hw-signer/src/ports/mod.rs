//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! Port interfaces (traits) for the signing hub.
//!
//! - **Driving Ports (Inbound):** the API consumers call through a channel
//! - **Driven Ports (Outbound):** the transport and codec the hub requires
//!   from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::HardwareSignerApi;
pub use outbound::{
    CodecError, DeviceReply, DeviceRequest, DeviceTransport, TransactionCodec, TransportError,
};
