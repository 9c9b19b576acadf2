//! Double SHA-256 over block headers.

use crate::types::Hash256;
use sha2::{Digest, Sha256};

/// Size of a serialized block header.
pub const HEADER_SIZE: usize = 80;

/// Compute `SHA256(SHA256(data))`.
pub fn hash256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    Hash256(out)
}
