//! Consumer channels.
//!
//! A channel is a cheap handle a single consumer uses to submit work to the
//! hub. Closing it (explicitly or by drop) cancels the consumer's
//! outstanding tasks; channel ids are never reused.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{
    AccountInfo, AccountSlot, ChannelId, SignedTransaction, SignerError, UnsignedTransaction,
};
use crate::ports::HardwareSignerApi;

use super::hub::HubCommand;

/// One consumer's handle onto the hub.
pub struct SignerChannel {
    id: ChannelId,
    command_tx: mpsc::Sender<HubCommand>,
    closed: AtomicBool,
}

impl SignerChannel {
    pub(crate) fn new(id: ChannelId, command_tx: mpsc::Sender<HubCommand>) -> Self {
        Self {
            id,
            command_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// This channel's id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Closes the channel, cancelling its outstanding tasks. Idempotent.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self
                .command_tx
                .send(HubCommand::CloseChannel { channel: self.id })
                .await;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, SignerError>>) -> HubCommand,
    ) -> Result<T, SignerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SignerError::Cancelled);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| SignerError::Cancelled)?;
        reply_rx.await.map_err(|_| SignerError::Cancelled)?
    }
}

#[async_trait]
impl HardwareSignerApi for SignerChannel {
    async fn get_account(
        &self,
        slot: AccountSlot,
        show_on_device: bool,
    ) -> Result<AccountInfo, SignerError> {
        self.request(|reply| HubCommand::GetAccount {
            channel: self.id,
            slot,
            show_on_device,
            reply,
        })
        .await
    }

    async fn confirm_account(&self, slot: AccountSlot) -> Result<bool, SignerError> {
        self.request(|reply| HubCommand::ConfirmAccount {
            channel: self.id,
            slot,
            reply,
        })
        .await
    }

    async fn sign_transaction(
        &self,
        slot: AccountSlot,
        transaction: UnsignedTransaction,
    ) -> Result<Option<SignedTransaction>, SignerError> {
        self.request(|reply| HubCommand::SignTransaction {
            channel: self.id,
            slot,
            transaction,
            reply,
        })
        .await
    }
}

impl Drop for SignerChannel {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Best effort; the hub also cleans up when every sender is gone.
            let _ = self
                .command_tx
                .try_send(HubCommand::CloseChannel { channel: self.id });
        }
    }
}
