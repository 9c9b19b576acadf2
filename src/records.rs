//! Fixed-width index records.
//!
//! Both records are three little-endian `u32` fields:
//!
//! ```text
//! BlockRecord: [file: u32][position: u32][length: u32]
//! FileRecord:  [blocks: u32][used: u32][capacity: u32]
//! ```

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

/// Encoded size of both record types.
pub const RECORD_SIZE: usize = 12;

/// Where a payload lives inside a kind's file sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRecord {
    /// File number within the kind's sequence.
    pub file: u32,
    /// Byte offset of the payload (just past the frame header).
    pub position: u32,
    /// Payload length in bytes.
    pub length: u32,
}

impl BlockRecord {
    /// Create a new block record
    pub fn new(file: u32, position: u32, length: u32) -> Self {
        Self { file, position, length }
    }

    /// Encode the record into its 12-byte form
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.put_u32_le(self.file);
        buf.put_u32_le(self.position);
        buf.put_u32_le(self.length);
        buf
    }

    /// Decode a record from exactly 12 bytes
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() != RECORD_SIZE {
            return Err(Error::corruption(format!(
                "Block record must be {} bytes, got {}",
                RECORD_SIZE,
                data.len()
            )));
        }

        let file = data.get_u32_le();
        let position = data.get_u32_le();
        let length = data.get_u32_le();

        Ok(Self { file, position, length })
    }
}

/// Usage accounting for one flat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileRecord {
    /// Number of live records pointing into the file.
    pub blocks: u32,
    /// Bytes appended so far.
    pub used: u32,
    /// Maximum size the file may grow to, fixed at creation.
    pub capacity: u32,
}

impl FileRecord {
    /// A fresh record for a newly allocated file.
    pub fn empty(capacity: u32) -> Self {
        Self { blocks: 0, used: 0, capacity }
    }

    /// Encode the record into its 12-byte form
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.put_u32_le(self.blocks);
        buf.put_u32_le(self.used);
        buf.put_u32_le(self.capacity);
        buf
    }

    /// Decode a record from exactly 12 bytes
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() != RECORD_SIZE {
            return Err(Error::corruption(format!(
                "File record must be {} bytes, got {}",
                RECORD_SIZE,
                data.len()
            )));
        }

        let blocks = data.get_u32_le();
        let used = data.get_u32_le();
        let capacity = data.get_u32_le();

        Ok(Self { blocks, used, capacity })
    }

    /// Whether a frame of `frame_length` bytes can be appended.
    pub fn fits(&self, frame_length: u32) -> bool {
        self.used as u64 + frame_length as u64 <= self.capacity as u64
    }
}
