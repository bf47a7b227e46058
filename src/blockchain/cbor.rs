//! Thin helpers over `ciborium` for the ledger encodings.

use ciborium::Value;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Serialize a CBOR value.
pub fn to_vec(value: &Value) -> BlockchainResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| BlockchainError::Codec(format!("CBOR encoding failed: {}", e)))?;
    Ok(buf)
}

/// Decode exactly one CBOR item spanning the whole input.
pub fn from_slice(bytes: &[u8]) -> BlockchainResult<Value> {
    let mut reader = bytes;
    let value: Value = ciborium::de::from_reader(&mut reader)
        .map_err(|e| BlockchainError::Codec(format!("CBOR decoding failed: {}", e)))?;
    if !reader.is_empty() {
        return Err(BlockchainError::Codec(format!(
            "{} trailing bytes after CBOR item",
            reader.len()
        )));
    }
    Ok(value)
}

pub fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

pub fn bytes(b: impl Into<Vec<u8>>) -> Value {
    Value::Bytes(b.into())
}

/// Read an unsigned integer out of a decoded value.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) => u64::try_from(i128::from(*i)).ok(),
        _ => None,
    }
}
