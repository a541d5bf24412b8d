//! Core wallet entities: accounts, keys, and transactions.
//!
//! Transaction *construction and validation* are external concerns; the types
//! here only carry the data a signing flow needs to move around.

use serde::{Deserialize, Serialize};

/// Public key returned by a signing device (32 bytes, Ed25519-style).
pub type PublicKey = [u8; 32];

/// Index of a derived key/account on the signing device.
pub type AccountSlot = u32;

/// A signature produced by the signing device over canonical signable bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A resolved device account: the public key at a slot plus its address.
///
/// Immutable once cached for a given (device, slot) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Public key read from the device.
    pub public_key: PublicKey,
    /// Human-readable address derived from the public key.
    pub address: String,
}

impl AccountInfo {
    /// Derives the account's address from its public key.
    pub fn from_public_key(public_key: PublicKey) -> Self {
        let address = derive_address(&public_key);
        Self {
            public_key,
            address,
        }
    }
}

/// Derives the wallet's textual address form for a public key.
pub fn derive_address(public_key: &PublicKey) -> String {
    format!("hw1{}", hex::encode(&public_key[..20]))
}

/// A transaction intent awaiting a device signature.
///
/// `sender_public_key` is attached by the signing flow once the sender's
/// account slot has been resolved on the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Destination address.
    pub recipient: String,
    /// Transfer amount in base units.
    pub amount: u64,
    /// Network fee in base units.
    pub fee: u64,
    /// Sender account nonce.
    pub nonce: u64,
    /// Optional memo field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Sender public key, filled in before serialization for signing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<PublicKey>,
}

/// A fully signed, network-postable transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The transaction that was signed, including the sender public key.
    pub transaction: UnsignedTransaction,
    /// Device signature over the canonical signable bytes.
    pub signature: Signature,
}
