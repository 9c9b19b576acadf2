//! Key-value backend.
//!
//! Payloads live directly in the index database under their record key.
//! There are no flat files, no location records and no allocation; pruning
//! deletes the key and leaves space reclamation to the database.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::index::{layout, IndexDb};
use crate::store::{ensure_dirs, open_index, payload_length, resolve_range, BlockStore};
use crate::types::{DataKind, Hash256};

/// Block store keeping payloads as index database values.
pub struct KvBlockStore {
    options: Options,
    index: Option<IndexDb>,
}

impl KvBlockStore {
    /// Schema name recorded in the index.
    pub const NAME: &'static str = "levelblockstore";

    /// Create a closed store. Call `ensure()` and `open()` before use.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, index: None })
    }

    /// The options this store was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether `open()` has succeeded and `close()` hasn't been called since.
    pub fn is_open(&self) -> bool {
        self.index.is_some()
    }

    fn index(&self) -> Result<&IndexDb> {
        self.index.as_ref().ok_or(Error::Closed)
    }
}

impl BlockStore for KvBlockStore {
    fn ensure(&self) -> Result<()> {
        ensure_dirs(&self.options)
    }

    fn open(&mut self) -> Result<()> {
        if self.index.is_some() {
            return Ok(());
        }
        self.index = Some(open_index(&self.options, Self::NAME)?);
        log::info!("Opened KvBlockStore (memory: {})", self.options.memory);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(index) = self.index.take() {
            index.close();
            log::info!("Closed KvBlockStore");
        }
        Ok(())
    }

    fn write(&self, kind: DataKind, hash: &Hash256, data: &[u8]) -> Result<bool> {
        let index = self.index()?;
        payload_length(kind, data)?;
        let written = index.put_if_absent(&layout::record_key(kind, hash), data)?;
        if written {
            log::debug!("Wrote {} {} ({} bytes)", kind, hash, data.len());
        }
        Ok(written)
    }

    fn read(
        &self,
        kind: DataKind,
        hash: &Hash256,
        offset: Option<u32>,
        length: Option<u32>,
    ) -> Result<Option<Vec<u8>>> {
        let data = match self.index()?.get(&layout::record_key(kind, hash))? {
            Some(data) => data,
            None => return Ok(None),
        };

        let size = u32::try_from(data.len())
            .map_err(|_| Error::corruption(format!("{} {} is larger than 4GiB", kind, hash)))?;
        let (start, len) = resolve_range(size, offset, length)?;
        if start == 0 && len == size {
            return Ok(Some(data));
        }

        let start = start as usize;
        Ok(Some(data[start..start + len as usize].to_vec()))
    }

    fn has(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        self.index()?.has(&layout::record_key(kind, hash))
    }

    fn prune(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        let removed = self.index()?.remove(&layout::record_key(kind, hash))?;
        if removed {
            log::debug!("Pruned {} {}", kind, hash);
        }
        Ok(removed)
    }
}
