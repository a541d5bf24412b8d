//! Adapters: concrete implementations of the outbound ports.

pub mod codec;
pub mod mock;

pub use codec::JsonTxCodec;
pub use mock::MockDevice;
