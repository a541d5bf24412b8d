//! # Driving Ports (Inbound API)
//!
//! The API the signing hub exposes to wallet consumers.

use async_trait::async_trait;

use crate::domain::{AccountInfo, AccountSlot, SignedTransaction, SignerError, UnsignedTransaction};

/// Primary API for requesting work from the signing device.
///
/// Obtained per consumer by opening a channel on the hub; every call is
/// queued and executed by the hub one exchange at a time.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to support concurrent access
/// from multiple async tasks.
#[async_trait]
pub trait HardwareSignerApi: Send + Sync {
    /// Read the account at `slot`.
    ///
    /// With `show_on_device` false this is a silent read, served from the
    /// per-device cache when a valid entry exists. With it true the device
    /// displays the account and waits for the human, so the long timeout
    /// applies and the cache is bypassed.
    async fn get_account(
        &self,
        slot: AccountSlot,
        show_on_device: bool,
    ) -> Result<AccountInfo, SignerError>;

    /// Display the account at `slot` on the device and wait for the human.
    ///
    /// Returns `Ok(true)` when confirmed, `Ok(false)` when declined on the
    /// device. A decline is an answer, not a failure.
    async fn confirm_account(&self, slot: AccountSlot) -> Result<bool, SignerError>;

    /// Sign `transaction` with the key at `slot`, waiting for on-device
    /// approval.
    ///
    /// Returns `Ok(None)` when the human declines the signature.
    async fn sign_transaction(
        &self,
        slot: AccountSlot,
        transaction: UnsignedTransaction,
    ) -> Result<Option<SignedTransaction>, SignerError>;
}
