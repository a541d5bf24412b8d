//! Service layer: the hub actor, consumer channels, and their wiring.

pub mod channel;
pub mod config;
pub mod events;
pub mod hub;

pub use channel::SignerChannel;
pub use config::{ConfigError, HubConfig};
pub use events::{DeviceStatus, HubEvent};
pub use hub::{HubHandle, SignerHub};
