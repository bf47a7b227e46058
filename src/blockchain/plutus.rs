//! Plutus data: the structured values carried as datums and redeemers.
//!
//! # Encoding
//! - `Constr` alternatives 0..=6 use tags 121..=127, 7..=127 use 1280..=1400,
//!   anything larger falls back to tag 102 `[alternative, fields]`
//! - Integers outside the CBOR major-type range use bignum tags 2/3
//! - Byte strings are bounded to 64 bytes per chunk; longer values are
//!   rejected instead of chunked
//!
//! Arrays are written with definite lengths. Decoding accepts both definite
//! and indefinite forms, so datums produced by other tooling read back fine.

use ciborium::value::{Integer, Value};

use crate::blockchain::cbor;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Largest byte string the ledger accepts in a single Plutus data chunk.
pub const MAX_BOUNDED_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    Constr { alternative: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn constr(alternative: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr { alternative, fields }
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        PlutusData::Bytes(b.into())
    }

    /// UTF-8 text as a byte string.
    pub fn text(s: &str) -> Self {
        PlutusData::Bytes(s.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlutusData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn to_value(&self) -> BlockchainResult<Value> {
        Ok(match self {
            PlutusData::Constr { alternative, fields } => {
                let fields = Value::Array(
                    fields
                        .iter()
                        .map(|f| f.to_value())
                        .collect::<BlockchainResult<Vec<_>>>()?,
                );
                match *alternative {
                    0..=6 => Value::Tag(121 + alternative, Box::new(fields)),
                    7..=127 => Value::Tag(1280 + alternative - 7, Box::new(fields)),
                    alt => Value::Tag(102, Box::new(Value::Array(vec![cbor::uint(alt), fields]))),
                }
            }
            PlutusData::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.to_value()?, v.to_value()?)))
                    .collect::<BlockchainResult<Vec<_>>>()?,
            ),
            PlutusData::List(items) => Value::Array(
                items
                    .iter()
                    .map(|i| i.to_value())
                    .collect::<BlockchainResult<Vec<_>>>()?,
            ),
            PlutusData::Int(n) => match Integer::try_from(*n) {
                Ok(i) => Value::Integer(i),
                Err(_) => bignum(*n),
            },
            PlutusData::Bytes(b) => {
                if b.len() > MAX_BOUNDED_BYTES {
                    return Err(BlockchainError::Codec(format!(
                        "byte string of {} bytes exceeds the {}-byte Plutus bound",
                        b.len(),
                        MAX_BOUNDED_BYTES
                    )));
                }
                Value::Bytes(b.clone())
            }
        })
    }

    pub fn from_value(value: &Value) -> BlockchainResult<Self> {
        match value {
            Value::Tag(tag, inner) => match *tag {
                121..=127 => Ok(PlutusData::constr(tag - 121, fields_of(inner)?)),
                1280..=1400 => Ok(PlutusData::constr(tag - 1280 + 7, fields_of(inner)?)),
                102 => match inner.as_ref() {
                    Value::Array(pair) if pair.len() == 2 => {
                        let alternative = cbor::as_u64(&pair[0]).ok_or_else(|| {
                            BlockchainError::Codec("constructor alternative is not a uint".into())
                        })?;
                        Ok(PlutusData::constr(alternative, fields_of(&pair[1])?))
                    }
                    _ => Err(BlockchainError::Codec("malformed tag 102 constructor".into())),
                },
                2 | 3 => {
                    let magnitude = match inner.as_ref() {
                        Value::Bytes(b) if b.len() <= 16 => {
                            b.iter().fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte))
                        }
                        _ => {
                            return Err(BlockchainError::Codec(
                                "bignum does not fit in 128 bits".into(),
                            ))
                        }
                    };
                    let n = i128::try_from(magnitude).map_err(|_| {
                        BlockchainError::Codec("bignum does not fit in 128 bits".into())
                    })?;
                    Ok(PlutusData::Int(if *tag == 2 { n } else { -1 - n }))
                }
                other => Err(BlockchainError::Codec(format!(
                    "unexpected CBOR tag {} in Plutus data",
                    other
                ))),
            },
            Value::Map(entries) => Ok(PlutusData::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((Self::from_value(k)?, Self::from_value(v)?)))
                    .collect::<BlockchainResult<Vec<_>>>()?,
            )),
            Value::Array(items) => Ok(PlutusData::List(
                items
                    .iter()
                    .map(Self::from_value)
                    .collect::<BlockchainResult<Vec<_>>>()?,
            )),
            Value::Integer(i) => Ok(PlutusData::Int(i128::from(*i))),
            Value::Bytes(b) => Ok(PlutusData::Bytes(b.clone())),
            _ => Err(BlockchainError::Codec(
                "unsupported CBOR item in Plutus data".into(),
            )),
        }
    }

    pub fn to_cbor(&self) -> BlockchainResult<Vec<u8>> {
        cbor::to_vec(&self.to_value()?)
    }

    pub fn to_hex(&self) -> BlockchainResult<String> {
        Ok(hex::encode(self.to_cbor()?))
    }

    pub fn from_cbor(bytes: &[u8]) -> BlockchainResult<Self> {
        Self::from_value(&cbor::from_slice(bytes)?)
    }

    pub fn from_hex(s: &str) -> BlockchainResult<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| BlockchainError::Codec(format!("invalid hex: {}", e)))?;
        Self::from_cbor(&bytes)
    }
}

fn fields_of(value: &Value) -> BlockchainResult<Vec<PlutusData>> {
    match value {
        Value::Array(items) => items.iter().map(PlutusData::from_value).collect(),
        _ => Err(BlockchainError::Codec("constructor fields are not a list".into())),
    }
}

fn bignum(n: i128) -> Value {
    let (tag, magnitude) = if n >= 0 {
        (2, n as u128)
    } else {
        (3, (-1 - n) as u128)
    };
    let be = magnitude.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    Value::Tag(tag, Box::new(Value::Bytes(be[first..].to_vec())))
}
