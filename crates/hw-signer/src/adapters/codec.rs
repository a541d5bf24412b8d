//! JSON transaction codec.

use crate::domain::UnsignedTransaction;
use crate::ports::{CodecError, TransactionCodec};

/// Serializes transactions as JSON in declaration order, the canonical
/// signable form the device firmware parses.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTxCodec;

impl TransactionCodec for JsonTxCodec {
    fn signable_bytes(&self, transaction: &UnsignedTransaction) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(transaction).map_err(|e| CodecError::Encoding(e.to_string()))
    }
}
