//! On-disk frame header.
//!
//! Every payload appended to a flat file is preceded by:
//!
//! ```text
//! [magic: u32 LE][length: u32 LE][hash: 32 bytes, undo/filter only]
//! ```
//!
//! Block and merkle block frames omit the hash; it is recomputed from the
//! 80-byte header at the start of the payload.

use crate::types::{DataKind, Hash256, HASH_SIZE};
use bytes::BufMut;

/// Header size of frames without a hash.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Header size of frames that carry a hash.
pub const HASHED_FRAME_HEADER_SIZE: usize = FRAME_HEADER_SIZE + HASH_SIZE;

/// Header length used for frames of `kind`.
pub fn header_size(kind: DataKind) -> usize {
    if kind.is_hashed() {
        HASHED_FRAME_HEADER_SIZE
    } else {
        FRAME_HEADER_SIZE
    }
}

/// The bytes written in front of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Network magic.
    pub magic: u32,
    /// Payload length in bytes.
    pub length: u32,
    /// Payload hash, present for hashed kinds.
    pub hash: Option<Hash256>,
}

impl FrameHeader {
    /// Build the header for a `length`-byte payload of `kind`.
    pub fn new(kind: DataKind, magic: u32, length: u32, hash: &Hash256) -> Self {
        let hash = if kind.is_hashed() { Some(*hash) } else { None };
        Self { magic, length, hash }
    }

    /// Size of the encoded header.
    pub fn encoded_size(&self) -> usize {
        if self.hash.is_some() {
            HASHED_FRAME_HEADER_SIZE
        } else {
            FRAME_HEADER_SIZE
        }
    }

    /// Encode the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        buf.put_u32_le(self.magic);
        buf.put_u32_le(self.length);
        if let Some(hash) = &self.hash {
            buf.put_slice(hash.as_bytes());
        }
        buf
    }
}
