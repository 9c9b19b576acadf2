//! Index database key layout.
//!
//! ```text
//! V                    -> schema marker
//! F[kind]              -> latest file number for kind (u32 LE)
//! f[kind][file u32 BE] -> FileRecord
//! b[kind][hash]        -> BlockRecord (flat-file) or raw payload (key-value)
//! ```
//!
//! File numbers are big-endian in keys so usage records iterate in order.

use crate::types::{DataKind, Hash256, HASH_SIZE};
use bytes::BufMut;

const VERSION: u8 = b'V';
const LATEST: u8 = b'F';
const USAGE: u8 = b'f';
const RECORD: u8 = b'b';

/// Key of the schema marker.
pub fn version_key() -> Vec<u8> {
    vec![VERSION]
}

/// Key of the latest-file pointer for `kind`.
pub fn latest_key(kind: DataKind) -> Vec<u8> {
    vec![LATEST, kind.tag()]
}

/// Key of the usage record for `(kind, file)`.
pub fn usage_key(kind: DataKind, file: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(6);
    key.put_u8(USAGE);
    key.put_u8(kind.tag());
    key.put_u32(file);
    key
}

/// Key of the record for `(kind, hash)`.
pub fn record_key(kind: DataKind, hash: &Hash256) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + HASH_SIZE);
    key.put_u8(RECORD);
    key.put_u8(kind.tag());
    key.put_slice(hash.as_bytes());
    key
}

/// Prefix shared by every record key of `kind`.
pub fn record_prefix(kind: DataKind) -> Vec<u8> {
    vec![RECORD, kind.tag()]
}

/// Extract the hash from a record key of `kind`.
pub fn parse_record_key(kind: DataKind, key: &[u8]) -> Option<Hash256> {
    let rest = key.strip_prefix(record_prefix(kind).as_slice())?;
    Hash256::from_slice(rest)
}

/// Encode a latest-file pointer value.
pub fn encode_file_number(file: u32) -> Vec<u8> {
    file.to_le_bytes().to_vec()
}

/// Decode a latest-file pointer value.
pub fn decode_file_number(value: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = value.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
