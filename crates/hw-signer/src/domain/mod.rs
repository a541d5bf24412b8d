//! Pure domain logic for the signing hub.
//!
//! Nothing in this module performs I/O or touches the clock; scheduling
//! decisions are driven by timestamps passed in from the service layer.

pub mod cache;
pub mod entities;
pub mod errors;
pub mod queue;
pub mod task;

pub use cache::AccountCache;
pub use entities::{
    AccountInfo, AccountSlot, ChannelId, DeviceFingerprint, PublicKey, Signature,
    SignedTransaction, TaskId, Timestamp, UnsignedTransaction, REFERENCE_SLOT,
};
pub use errors::SignerError;
pub use queue::{NextAction, TaskQueue};
pub use task::{QueuedTask, TaskKind, TaskState};
