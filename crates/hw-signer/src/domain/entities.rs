//! Identifiers and device identity types for the hub.

use std::fmt;

// Re-export from wallet-types for convenience
pub use wallet_types::{
    AccountInfo, AccountSlot, PublicKey, Signature, SignedTransaction, UnsignedTransaction,
};

/// Timestamp in milliseconds, relative to hub start.
pub type Timestamp = u64;

/// Identifier of a consumer channel. Monotonically increasing, never reused.
pub type ChannelId = u64;

/// Identifier of a queued task. Monotonically increasing, never reused.
pub type TaskId = u64;

/// The fixed account slot used to fingerprint the attached device.
pub const REFERENCE_SLOT: AccountSlot = 0;

/// Identity of the attached device: the first 8 bytes of the public key at
/// [`REFERENCE_SLOT`]. Two physically different devices (or the same device
/// after a seed change) produce different fingerprints.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceFingerprint([u8; 8]);

impl DeviceFingerprint {
    /// Derives the fingerprint from a reference-slot public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&key[..8]);
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceFingerprint({self})")
    }
}
