//! Storage interface and backends.
//!
//! [`BlockStore`] is the capability set every backend offers: write, read,
//! has and prune per [`DataKind`], plus the `ensure` / `open` / `close`
//! lifecycle. Two backends implement it:
//!
//! - [`FileBlockStore`]: framed records appended to rotating flat files, with
//!   the index database mapping hashes to file locations
//! - [`KvBlockStore`]: payloads stored directly as index database values
//!
//! [`create`] picks one from [`Options`] and returns it as [`AnyBlockStore`].

pub mod file;
pub mod kv;

pub use file::FileBlockStore;
pub use kv::KvBlockStore;

use crate::config::Options;
use crate::error::{Error, Result};
use crate::hash::HEADER_SIZE;
use crate::index::IndexDb;
use crate::types::{DataKind, Hash256};
use std::fs;

/// Current schema version of both backends' index layouts.
pub const INDEX_VERSION: u32 = 0;

/// Operations shared by every block store backend.
///
/// Lookups that miss are not errors: `read` returns `Ok(None)` and `prune`
/// returns `Ok(false)`.
pub trait BlockStore: Send + Sync {
    /// Create the directories the store needs.
    fn ensure(&self) -> Result<()>;

    /// Open the index, recovering it from disk if needed.
    fn open(&mut self) -> Result<()>;

    /// Close the index. Closing a closed store does nothing.
    fn close(&mut self) -> Result<()>;

    /// Store `data` under `(kind, hash)`.
    ///
    /// Returns `false` without touching anything if the hash already exists.
    fn write(&self, kind: DataKind, hash: &Hash256, data: &[u8]) -> Result<bool>;

    /// Read a payload, or a byte range of it.
    ///
    /// With no offset or length the whole payload is returned; with only an
    /// offset, everything from it to the end.
    fn read(
        &self,
        kind: DataKind,
        hash: &Hash256,
        offset: Option<u32>,
        length: Option<u32>,
    ) -> Result<Option<Vec<u8>>>;

    /// Whether a payload is stored under `(kind, hash)`.
    fn has(&self, kind: DataKind, hash: &Hash256) -> Result<bool>;

    /// Remove a payload. Returns `false` if it wasn't stored.
    fn prune(&self, kind: DataKind, hash: &Hash256) -> Result<bool>;

    /// Store a block.
    fn write_block(&self, hash: &Hash256, data: &[u8]) -> Result<bool> {
        self.write(DataKind::Block, hash, data)
    }

    /// Read a whole block.
    fn read_block(&self, hash: &Hash256) -> Result<Option<Vec<u8>>> {
        self.read(DataKind::Block, hash, None, None)
    }

    /// Whether a block is stored.
    fn has_block(&self, hash: &Hash256) -> Result<bool> {
        self.has(DataKind::Block, hash)
    }

    /// Remove a block.
    fn prune_block(&self, hash: &Hash256) -> Result<bool> {
        self.prune(DataKind::Block, hash)
    }

    /// Store a merkle block.
    fn write_merkle(&self, hash: &Hash256, data: &[u8]) -> Result<bool> {
        self.write(DataKind::MerkleBlock, hash, data)
    }

    /// Read a whole merkle block.
    fn read_merkle(&self, hash: &Hash256) -> Result<Option<Vec<u8>>> {
        self.read(DataKind::MerkleBlock, hash, None, None)
    }

    /// Whether a merkle block is stored.
    fn has_merkle(&self, hash: &Hash256) -> Result<bool> {
        self.has(DataKind::MerkleBlock, hash)
    }

    /// Remove a merkle block.
    fn prune_merkle(&self, hash: &Hash256) -> Result<bool> {
        self.prune(DataKind::MerkleBlock, hash)
    }

    /// Store undo data for a block.
    fn write_undo(&self, hash: &Hash256, data: &[u8]) -> Result<bool> {
        self.write(DataKind::Undo, hash, data)
    }

    /// Read undo data for a block.
    fn read_undo(&self, hash: &Hash256) -> Result<Option<Vec<u8>>> {
        self.read(DataKind::Undo, hash, None, None)
    }

    /// Whether undo data is stored for a block.
    fn has_undo(&self, hash: &Hash256) -> Result<bool> {
        self.has(DataKind::Undo, hash)
    }

    /// Remove undo data for a block.
    fn prune_undo(&self, hash: &Hash256) -> Result<bool> {
        self.prune(DataKind::Undo, hash)
    }

    /// Store a compact filter for a block.
    fn write_filter(&self, hash: &Hash256, data: &[u8]) -> Result<bool> {
        self.write(DataKind::Filter, hash, data)
    }

    /// Read a compact filter for a block.
    fn read_filter(&self, hash: &Hash256) -> Result<Option<Vec<u8>>> {
        self.read(DataKind::Filter, hash, None, None)
    }

    /// Whether a compact filter is stored for a block.
    fn has_filter(&self, hash: &Hash256) -> Result<bool> {
        self.has(DataKind::Filter, hash)
    }

    /// Remove a compact filter for a block.
    fn prune_filter(&self, hash: &Hash256) -> Result<bool> {
        self.prune(DataKind::Filter, hash)
    }
}

/// One of the two backends, chosen at runtime.
pub enum AnyBlockStore {
    /// Flat-file backend.
    File(FileBlockStore),
    /// Key-value backend.
    Kv(KvBlockStore),
}

impl AnyBlockStore {
    /// Short name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyBlockStore::File(_) => FileBlockStore::NAME,
            AnyBlockStore::Kv(_) => KvBlockStore::NAME,
        }
    }
}

impl BlockStore for AnyBlockStore {
    fn ensure(&self) -> Result<()> {
        match self {
            AnyBlockStore::File(store) => store.ensure(),
            AnyBlockStore::Kv(store) => store.ensure(),
        }
    }

    fn open(&mut self) -> Result<()> {
        match self {
            AnyBlockStore::File(store) => store.open(),
            AnyBlockStore::Kv(store) => store.open(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            AnyBlockStore::File(store) => store.close(),
            AnyBlockStore::Kv(store) => store.close(),
        }
    }

    fn write(&self, kind: DataKind, hash: &Hash256, data: &[u8]) -> Result<bool> {
        match self {
            AnyBlockStore::File(store) => store.write(kind, hash, data),
            AnyBlockStore::Kv(store) => store.write(kind, hash, data),
        }
    }

    fn read(
        &self,
        kind: DataKind,
        hash: &Hash256,
        offset: Option<u32>,
        length: Option<u32>,
    ) -> Result<Option<Vec<u8>>> {
        match self {
            AnyBlockStore::File(store) => store.read(kind, hash, offset, length),
            AnyBlockStore::Kv(store) => store.read(kind, hash, offset, length),
        }
    }

    fn has(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        match self {
            AnyBlockStore::File(store) => store.has(kind, hash),
            AnyBlockStore::Kv(store) => store.has(kind, hash),
        }
    }

    fn prune(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        match self {
            AnyBlockStore::File(store) => store.prune(kind, hash),
            AnyBlockStore::Kv(store) => store.prune(kind, hash),
        }
    }
}

/// Build the backend `options` call for.
///
/// In-memory options get the key-value backend; everything else gets flat
/// files. The store still has to be ensured and opened.
pub fn create(options: Options) -> Result<AnyBlockStore> {
    if options.memory {
        Ok(AnyBlockStore::Kv(KvBlockStore::new(options)?))
    } else {
        Ok(AnyBlockStore::File(FileBlockStore::new(options)?))
    }
}

/// Create the data directory and the index directory beneath it.
pub(crate) fn ensure_dirs(options: &Options) -> Result<()> {
    if options.memory {
        return Ok(());
    }
    fs::create_dir_all(&options.location)?;
    if let Some(parent) = options.index_path().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Open the index database for `options` and check it belongs to `name`.
pub(crate) fn open_index(options: &Options, name: &str) -> Result<IndexDb> {
    let index = if options.memory {
        IndexDb::in_memory(options.cache_size)?
    } else {
        IndexDb::open(&options.index_path(), options.cache_size)?
    };
    index.verify(name, INDEX_VERSION)?;
    Ok(index)
}

/// Check a payload can be stored as `kind` and return its length.
///
/// Block and merkle block payloads must hold the 80-byte header their hash
/// is recovered from.
pub(crate) fn payload_length(kind: DataKind, data: &[u8]) -> Result<u32> {
    if !kind.is_hashed() && data.len() < HEADER_SIZE {
        return Err(Error::invalid_argument(format!(
            "{} payload of {} bytes is shorter than its {}-byte header",
            kind,
            data.len(),
            HEADER_SIZE
        )));
    }
    u32::try_from(data.len()).map_err(|_| {
        Error::invalid_argument(format!("{} payload of {} bytes is too large", kind, data.len()))
    })
}

/// Resolve an optional `(offset, length)` request against a payload of
/// `size` bytes, returning the concrete `(offset, length)` to read.
pub(crate) fn resolve_range(
    size: u32,
    offset: Option<u32>,
    length: Option<u32>,
) -> Result<(u32, u32)> {
    let offset = offset.unwrap_or(0);
    let length = length.unwrap_or_else(|| size.saturating_sub(offset));

    if offset as u64 + length as u64 > size as u64 {
        return Err(Error::OutOfBounds { offset, length, size });
    }

    Ok((offset, length))
}
