//! Hub-published events and device status.

use crate::domain::DeviceFingerprint;

/// Events broadcast by the hub to interested consumers (UI layers, logs).
///
/// Delivered over a `tokio::sync::broadcast` channel; slow consumers may
/// observe lag, never block the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubEvent {
    /// A device identity was observed that differs from the previous one
    /// (including the first device seen).
    DeviceChanged {
        /// Identity of the newly observed device.
        fingerprint: DeviceFingerprint,
    },
    /// The previously attached device is no longer reachable.
    DeviceLost,
    /// Periodic countdown while a long-running confirmation waits on the
    /// device.
    ConfirmationCountdown {
        /// Milliseconds left before the long timeout expires.
        remaining_ms: u64,
    },
}

/// Snapshot of the hub's view of the device, published on a watch channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Identity of the attached device, if one is present.
    pub fingerprint: Option<DeviceFingerprint>,
    /// Whether this platform can reach devices at all.
    pub platform_supported: bool,
}

impl DeviceStatus {
    /// True while a device is attached.
    pub fn connected(&self) -> bool {
        self.fingerprint.is_some()
    }
}
