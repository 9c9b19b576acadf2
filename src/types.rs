//! Core value types: data kinds and content hashes.

use std::fmt;

/// The four independent categories of data kept by the store.
///
/// Each kind has its own record namespace in the index, its own file-number
/// sequence and its own filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataKind {
    /// Full serialized blocks.
    Block = 1,
    /// Spent-coin undo data for a block.
    Undo = 2,
    /// Compact block filters.
    Filter = 3,
    /// Merkle blocks.
    MerkleBlock = 4,
}

impl DataKind {
    /// Every kind, in tag order.
    pub const ALL: [DataKind; 4] =
        [DataKind::Block, DataKind::Undo, DataKind::Filter, DataKind::MerkleBlock];

    /// One-byte tag used in index keys.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Dense position of this kind, usable as an array index.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// Filename prefix for this kind's flat files.
    pub fn prefix(self) -> &'static str {
        match self {
            DataKind::Block => "blk",
            DataKind::Undo => "blu",
            DataKind::Filter => "blf",
            DataKind::MerkleBlock => "blm",
        }
    }

    /// Whether frames of this kind carry the 32-byte hash after the length.
    ///
    /// Blocks and merkle blocks don't need it: their hash is the double hash
    /// of the 80-byte header that starts the payload.
    pub fn is_hashed(self) -> bool {
        matches!(self, DataKind::Undo | DataKind::Filter)
    }

    /// Whether `open()` rebuilds this kind's index from its files.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, DataKind::Filter)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Block => "block",
            DataKind::Undo => "undo",
            DataKind::Filter => "filter",
            DataKind::MerkleBlock => "merkle block",
        };
        f.write_str(name)
    }
}

/// Size of a content hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte content hash identifying a stored payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; HASH_SIZE]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_SIZE]);

    /// Build a hash from a slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; HASH_SIZE] = bytes.try_into().ok()?;
        Some(Hash256(array))
    }

    /// Borrow the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash256 {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash256(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let tags: Vec<u8> = DataKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, vec![1, 2, 3, 4]);
        assert_eq!(DataKind::MerkleBlock.tag(), 4);
    }

    #[test]
    fn test_kind_indices_are_dense() {
        let mut seen = [false; 4];
        for kind in DataKind::ALL {
            seen[kind.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_kind_properties() {
        assert!(!DataKind::Block.is_hashed());
        assert!(!DataKind::MerkleBlock.is_hashed());
        assert!(DataKind::Undo.is_hashed());
        assert!(DataKind::Filter.is_hashed());

        assert!(DataKind::Block.is_recoverable());
        assert!(DataKind::Undo.is_recoverable());
        assert!(!DataKind::Filter.is_recoverable());
    }

    #[test]
    fn test_hash_display() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hash = Hash256(bytes);
        let hex = hash.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }

    #[test]
    fn test_hash_from_slice() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_none());
        assert_eq!(Hash256::from_slice(&[7u8; 32]), Some(Hash256([7u8; 32])));
    }
}
