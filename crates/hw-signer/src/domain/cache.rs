//! Per-device account cache.
//!
//! Entries are valid only for the device identity that produced them. The
//! cache clears itself whenever the attached device's fingerprint changes or
//! the device disappears.

use std::collections::HashMap;

use super::entities::{AccountInfo, AccountSlot, DeviceFingerprint};

/// Cache of account reads keyed by slot, scoped to one device identity.
#[derive(Debug, Default)]
pub struct AccountCache {
    device: Option<DeviceFingerprint>,
    accounts: HashMap<AccountSlot, AccountInfo>,
}

impl AccountCache {
    /// Creates an empty cache bound to no device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of the device the cached entries belong to.
    pub fn device(&self) -> Option<DeviceFingerprint> {
        self.device
    }

    /// Cached entry for `slot`, only while a device is attached.
    pub fn get(&self, slot: AccountSlot) -> Option<&AccountInfo> {
        self.device.and(self.accounts.get(&slot))
    }

    /// Stores an entry for `slot`. Ignored when no device is attached; a
    /// result that raced a device loss must not repopulate the cache.
    pub fn insert(&mut self, slot: AccountSlot, info: AccountInfo) {
        if self.device.is_some() {
            self.accounts.insert(slot, info);
        }
    }

    /// Binds the cache to `fingerprint`. A changed identity drops every
    /// entry; re-observing the same identity keeps them.
    pub fn set_device(&mut self, fingerprint: DeviceFingerprint) {
        if self.device != Some(fingerprint) {
            self.device = Some(fingerprint);
            self.accounts.clear();
        }
    }

    /// Unbinds the cache on device loss, dropping every entry.
    pub fn clear_device(&mut self) {
        self.device = None;
        self.accounts.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
