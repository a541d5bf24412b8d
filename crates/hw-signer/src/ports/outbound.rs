//! # Driven Ports (Outbound SPI)
//!
//! The transport and serialization interfaces the hub requires the host
//! application to implement.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{PublicKey, Signature, SignedTransaction, SignerError, UnsignedTransaction};

/// A single request sent to the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Read the public key at a derivation slot, silently.
    GetPublicKey {
        /// Target account slot.
        slot: u32,
    },
    /// Read the public key at a slot, displaying it for on-device
    /// confirmation.
    GetPublicKeyConfirm {
        /// Target account slot.
        slot: u32,
    },
    /// Sign a canonical payload with the key at a slot, after on-device
    /// approval.
    SignPayload {
        /// Target account slot.
        slot: u32,
        /// Canonical signable bytes.
        payload: Vec<u8>,
    },
}

/// A successful reply from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceReply {
    /// Reply to either public-key request.
    PublicKey(PublicKey),
    /// Reply to a sign request.
    Signature(Signature),
}

/// Errors from a device exchange, as the transport reports them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No device is attached.
    #[error("no device found")]
    NotFound,
    /// The device disconnected mid-exchange.
    #[error("device disconnected")]
    Disconnected,
    /// The device requires PIN entry.
    #[error("device locked")]
    Locked,
    /// The human declined the operation on the device.
    #[error("rejected on device")]
    Rejected,
    /// The exchange exceeded its deadline.
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),
    /// Any other device or transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportError> for SignerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound | TransportError::Disconnected => {
                SignerError::DeviceUnreachable
            }
            TransportError::Locked => SignerError::DeviceLocked,
            TransportError::Rejected => SignerError::UserRejected,
            TransportError::Timeout(d) => SignerError::Timeout {
                timeout_ms: d.as_millis() as u64,
            },
            TransportError::Other(msg) => SignerError::Unknown(msg),
        }
    }
}

/// Abstract interface to the physical signing device.
///
/// The hub issues at most one `exchange` at a time; implementations need not
/// handle concurrent calls but must be `Send + Sync` to cross task
/// boundaries.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Performs one request/reply exchange with the device, bounded by
    /// `timeout`.
    ///
    /// Implementations should return [`TransportError::Timeout`] when the
    /// deadline passes; the hub also enforces the deadline on its side.
    async fn exchange(
        &self,
        request: DeviceRequest,
        timeout: Duration,
    ) -> Result<DeviceReply, TransportError>;

    /// Whether the current platform can reach devices at all (e.g. USB
    /// permissions, browser API availability).
    fn is_supported(&self) -> bool;
}

/// Errors from transaction serialization.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The transaction could not be serialized.
    #[error("transaction encoding failed: {0}")]
    Encoding(String),
}

impl From<CodecError> for SignerError {
    fn from(err: CodecError) -> Self {
        SignerError::Unknown(err.to_string())
    }
}

/// Serializes transactions into the canonical signable form the device
/// expects, and assembles the postable result.
pub trait TransactionCodec: Send + Sync {
    /// Produces the canonical signable bytes for `transaction`.
    fn signable_bytes(&self, transaction: &UnsignedTransaction) -> Result<Vec<u8>, CodecError>;

    /// Combines a transaction with its device signature into the
    /// network-postable form.
    fn attach_signature(
        &self,
        transaction: UnsignedTransaction,
        signature: Signature,
    ) -> SignedTransaction {
        SignedTransaction {
            transaction,
            signature,
        }
    }
}
