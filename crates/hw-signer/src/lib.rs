//! # Hardware Signing Device Hub
//!
//! Serializes all communication with a USB-attached hardware signing device.
//!
//! ## Purpose
//!
//! A signing device accepts exactly one request at a time, needs a minimum
//! inter-request delay, must be polled to discover presence/identity changes,
//! and some operations wait on a human confirming on the device. This crate
//! coordinates any number of concurrent UI-driven consumers against that
//! single, slow, human-in-the-loop resource.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Single-flight: at most one exchange in progress | `domain/queue.rs` - `next_action()` |
//! | INVARIANT-2 | Tasks settle exactly once | `domain/task.rs` - state machine |
//! | INVARIANT-3 | Cache valid only for the current fingerprint | `domain/cache.rs` - `set_device()` |
//! | INVARIANT-4 | FIFO among non-probe tasks, hub-wide | `domain/queue.rs` - `front_pending()` |
//! | INVARIANT-5 | Probe preempts regular tasks when due | `domain/queue.rs` - `next_action()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - JSON tx codec, scripted mock device                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - HardwareSignerApi trait                    │
//! │  ports/outbound.rs - DeviceTransport, TransactionCodec traits   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/hub.rs     - SignerHub actor (queue owner, run loop)   │
//! │  service/channel.rs - SignerChannel consumer handle             │
//! │  service/events.rs  - DeviceStatus watch + HubEvent broadcast   │
//! │  domain/            - task state machine, queue, cache, errors  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let hub = SignerHub::spawn(transport, codec, HubConfig::default())?;
//! let channel = hub.open_channel().await?;
//! let account = channel.get_account(0, false).await?;
//! let signed = channel.sign_transaction(0, unsigned).await?;
//! channel.close().await;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{JsonTxCodec, MockDevice};
pub use domain::{
    AccountInfo, AccountSlot, ChannelId, DeviceFingerprint, SignerError, TaskId, REFERENCE_SLOT,
};
pub use ports::{
    DeviceReply, DeviceRequest, DeviceTransport, HardwareSignerApi, TransactionCodec,
    TransportError,
};
pub use service::{DeviceStatus, HubConfig, HubEvent, HubHandle, SignerChannel, SignerHub};
