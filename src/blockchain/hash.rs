//! Blake2b digests used for policy ids, key hashes and transaction ids.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// blake2b-224 over the concatenation of `parts`.
pub fn blake2b_224(parts: &[&[u8]]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// blake2b-256 over the concatenation of `parts`.
pub fn blake2b_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
