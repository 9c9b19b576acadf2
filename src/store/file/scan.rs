//! Frame scanner used to rebuild the index from raw flat files.
//!
//! The scanner does not trust frame boundaries. It looks for the network
//! magic one byte at a time, so leading garbage, torn writes and misaligned
//! data only cost the bytes they occupy. A frame whose header parses but
//! whose body runs off the end of the file is logged and skipped, and the
//! search resumes from wherever the cursor stopped.

use crate::error::{Error, Result};
use crate::hash::{hash256, HEADER_SIZE};
use crate::records::BlockRecord;
use crate::types::{DataKind, Hash256, HASH_SIZE};

/// A frame recovered from a flat file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFrame {
    /// Hash the payload is indexed under.
    pub hash: Hash256,
    /// Location of the payload.
    pub record: BlockRecord,
}

/// Cursor over the contents of one flat file.
pub struct FrameScanner<'a> {
    data: &'a [u8],
    offset: usize,
    kind: DataKind,
    magic: u32,
    file: u32,
}

impl<'a> FrameScanner<'a> {
    /// Scan `data`, the full contents of file `file` of `kind`.
    pub fn new(data: &'a [u8], kind: DataKind, magic: u32, file: u32) -> Self {
        Self { data, offset: 0, kind, magic, file }
    }

    /// Current cursor position. Once the scan is exhausted this is the
    /// number of bytes of the file accounted for.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::corruption(format!(
                "Need {} bytes at offset {}, {} left",
                len,
                self.offset,
                self.remaining()
            )));
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        if self.remaining() < len {
            return Err(Error::corruption(format!(
                "Frame body of {} bytes at offset {} overruns file ({} left)",
                len,
                self.offset,
                self.remaining()
            )));
        }
        self.offset += len;
        Ok(())
    }

    fn cursor_position(&self) -> Result<u32> {
        u32::try_from(self.offset)
            .map_err(|_| Error::corruption(format!("Offset {} exceeds u32", self.offset)))
    }

    /// Parse the rest of a frame whose magic was just consumed.
    fn parse_frame(&mut self) -> Result<ScannedFrame> {
        let length = self.read_u32()?;

        let (hash, position) = if self.kind.is_hashed() {
            let hash = Hash256::from_slice(self.read_bytes(HASH_SIZE)?)
                .ok_or_else(|| Error::corruption("Short hash"))?;
            let position = self.cursor_position()?;
            self.skip(length as usize)?;
            (hash, position)
        } else {
            // Checked before touching the body so a bad length only costs
            // its own frame header.
            let body = (length as usize).checked_sub(HEADER_SIZE).ok_or_else(|| {
                Error::corruption(format!("Frame length {} shorter than a header", length))
            })?;
            let position = self.cursor_position()?;
            let hash = hash256(self.read_bytes(HEADER_SIZE)?);
            self.skip(body)?;
            (hash, position)
        };

        Ok(ScannedFrame { hash, record: BlockRecord::new(self.file, position, length) })
    }

    /// Find and parse the next frame, or `None` once fewer than 4 bytes remain.
    pub fn next_frame(&mut self) -> Option<ScannedFrame> {
        while self.remaining() >= 4 {
            let magic = match self.read_u32() {
                Ok(magic) => magic,
                Err(_) => return None,
            };

            if magic != self.magic {
                // Net advance of one byte.
                self.offset -= 3;
                continue;
            }

            match self.parse_frame() {
                Ok(frame) => return Some(frame),
                Err(e) => {
                    log::warn!(
                        "Skipping malformed {} frame in file {} at offset {}: {}",
                        self.kind,
                        self.file,
                        self.offset,
                        e
                    );
                }
            }
        }
        None
    }
}

impl Iterator for FrameScanner<'_> {
    type Item = ScannedFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::file::frame::FrameHeader;

    const MAGIC: u32 = 0xd9b4bef9;

    fn block_payload(seed: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
    }

    fn frame(kind: DataKind, hash: &Hash256, payload: &[u8]) -> Vec<u8> {
        let mut out = FrameHeader::new(kind, MAGIC, payload.len() as u32, hash).encode();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_scan_blocks() {
        let a = block_payload(1, 120);
        let b = block_payload(2, 80);
        let mut data = frame(DataKind::Block, &Hash256::ZERO, &a);
        data.extend(frame(DataKind::Block, &Hash256::ZERO, &b));

        let mut scanner = FrameScanner::new(&data, DataKind::Block, MAGIC, 3);
        let frames: Vec<_> = scanner.by_ref().collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].hash, hash256(&a[..80]));
        assert_eq!(frames[0].record, BlockRecord::new(3, 8, 120));
        assert_eq!(frames[1].hash, hash256(&b[..80]));
        assert_eq!(frames[1].record, BlockRecord::new(3, 8 + 120 + 8, 80));
        assert_eq!(scanner.offset(), data.len());
    }

    #[test]
    fn test_scan_undo_uses_stored_hash() {
        let hash = Hash256([5u8; 32]);
        let data = frame(DataKind::Undo, &hash, b"spent coins");

        let frames: Vec<_> = FrameScanner::new(&data, DataKind::Undo, MAGIC, 0).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].hash, hash);
        assert_eq!(frames[0].record, BlockRecord::new(0, 40, 11));
    }

    #[test]
    fn test_scan_skips_leading_garbage() {
        let payload = block_payload(9, 100);
        let mut data = vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        data.extend(frame(DataKind::MerkleBlock, &Hash256::ZERO, &payload));

        let frames: Vec<_> = FrameScanner::new(&data, DataKind::MerkleBlock, MAGIC, 0).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].record.position, 5 + 8);
        assert_eq!(frames[0].hash, hash256(&payload[..80]));
    }

    #[test]
    fn test_scan_skips_truncated_frame() {
        let good = block_payload(1, 90);
        let mut data = frame(DataKind::Block, &Hash256::ZERO, &good);
        let mut torn = frame(DataKind::Block, &Hash256::ZERO, &block_payload(2, 200));
        torn.truncate(8 + 120);
        data.extend(torn);

        let mut scanner = FrameScanner::new(&data, DataKind::Block, MAGIC, 0);
        let frames: Vec<_> = scanner.by_ref().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].hash, hash256(&good[..80]));
        assert!(scanner.offset() <= data.len());
    }

    #[test]
    fn test_scan_rejects_short_block_frame() {
        // Length field claims fewer bytes than the 80-byte header it must hold.
        let mut bad = Vec::new();
        bad.extend_from_slice(&MAGIC.to_le_bytes());
        bad.extend_from_slice(&10u32.to_le_bytes());
        bad.extend_from_slice(&[0u8; 80]);

        let frames: Vec<_> = FrameScanner::new(&bad, DataKind::Block, MAGIC, 0).collect();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_short_block_frame_does_not_hide_next() {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC.to_le_bytes());
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(&[0x11u8; 10]);
        let good = block_payload(3, 120);
        data.extend(frame(DataKind::Block, &Hash256::ZERO, &good));

        let frames: Vec<_> = FrameScanner::new(&data, DataKind::Block, MAGIC, 0).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].hash, hash256(&good[..80]));
        assert_eq!(frames[0].record, BlockRecord::new(0, 18 + 8, 120));
    }

    #[test]
    fn test_scan_empty_and_tiny_files() {
        assert_eq!(FrameScanner::new(&[], DataKind::Block, MAGIC, 0).count(), 0);

        let mut scanner = FrameScanner::new(&[1, 2, 3], DataKind::Undo, MAGIC, 0);
        assert!(scanner.next().is_none());
        assert_eq!(scanner.offset(), 0);
    }

    #[test]
    fn test_scan_ignores_other_network() {
        let data = frame(DataKind::Undo, &Hash256([1u8; 32]), b"payload");
        let frames: Vec<_> = FrameScanner::new(&data, DataKind::Undo, 0x0709110b, 0).collect();
        assert!(frames.is_empty());
    }
}
