//! Error taxonomy exposed by the signing hub.
//!
//! All transport- and device-level failure shapes are remapped into this
//! closed set at the hub boundary; callers never see raw transport errors.

use thiserror::Error;

/// Failures surfaced to hub consumers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    /// No device detected, or the transport-level connection was lost.
    #[error("signing device unreachable")]
    DeviceUnreachable,

    /// Device present but requires PIN entry before use.
    #[error("signing device locked, PIN entry required")]
    DeviceLocked,

    /// The human explicitly declined the operation on the device.
    ///
    /// Most callers never observe this variant: `confirm_account` maps it to
    /// `Ok(false)` and `sign_transaction` to `Ok(None)`.
    #[error("operation rejected on the device")]
    UserRejected,

    /// An exchange exceeded its short/long timeout without a response.
    #[error("device exchange timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that expired, in milliseconds.
        timeout_ms: u64,
    },

    /// The task was cancelled (channel closed, or hub shut down) before it
    /// could settle from the device.
    #[error("request cancelled before completion")]
    Cancelled,

    /// Any other transport/device error, with its original message.
    #[error("device error: {0}")]
    Unknown(String),
}
