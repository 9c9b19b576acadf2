//! Index database.
//!
//! A thin wrapper over an embedded `redb` database holding a single ordered
//! byte-string table. Everything the stores persist outside their flat files
//! goes through here:
//!
//! - **Point reads**: `get` / `has`, each in its own read transaction
//! - **Atomic batches**: `write` commits an [`IndexBatch`] in one write
//!   transaction, the crash-consistency boundary of the store
//! - **Schema guard**: `verify` refuses an index created by another store
//!
//! See [`layout`] for the key families.

pub mod batch;
pub mod layout;

pub use batch::{BatchOp, IndexBatch};

use crate::error::{Error, Result};
use redb::backends::InMemoryBackend;
use redb::{Builder, Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;

const TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("blockstore");

/// Name and version written by the first store to open an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SchemaMarker {
    name: String,
    version: u32,
}

/// Handle to the index database.
pub struct IndexDb {
    db: Database,
}

impl IndexDb {
    /// Open or create an on-disk index at `path`.
    ///
    /// The parent directory must already exist.
    pub fn open(path: &Path, cache_size: usize) -> Result<Self> {
        let mut builder = Builder::new();
        builder.set_cache_size(cache_size);
        let db = builder.create(path)?;
        log::debug!("Opened index database at {:?}", path);
        Self::init(db)
    }

    /// Create an index that lives only in memory.
    pub fn in_memory(cache_size: usize) -> Result<Self> {
        let mut builder = Builder::new();
        builder.set_cache_size(cache_size);
        let db = builder.create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self> {
        // Read transactions fail on a table that was never created.
        let txn = db.begin_write()?;
        txn.open_table(TABLE)?;
        txn.commit()?;
        Ok(Self { db })
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Check whether `key` is present.
    pub fn has(&self, key: &[u8]) -> Result<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let present = table.get(key)?.is_some();
        Ok(present)
    }

    /// Apply every operation in `batch` atomically.
    pub fn write(&self, batch: IndexBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TABLE)?;
            for op in batch.iter() {
                match op {
                    BatchOp::Put { key, value } => {
                        table.insert(key.as_slice(), value.as_slice())?;
                    }
                    BatchOp::Delete { key } => {
                        table.remove(key.as_slice())?;
                    }
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Insert `value` under `key` unless the key already exists.
    ///
    /// Returns `false` without writing if the key was present. The check and
    /// the insert share one write transaction.
    pub fn put_if_absent(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let inserted = {
            let mut table = txn.open_table(TABLE)?;
            let present = table.get(key)?.is_some();
            if !present {
                table.insert(key, value)?;
            }
            !present
        };
        txn.commit()?;
        Ok(inserted)
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed;
        {
            let mut table = txn.open_table(TABLE)?;
            removed = table.remove(key)?.is_some();
        }
        txn.commit()?;
        Ok(removed)
    }

    /// Collect every entry whose key starts with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let mut entries = Vec::new();
        for item in table.range(prefix..)? {
            let (key, value) = item?;
            if !key.value().starts_with(prefix) {
                break;
            }
            entries.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }

    /// Close the database. Committed batches are already durable.
    pub fn close(self) {
        drop(self.db);
        log::debug!("Closed index database");
    }

    /// Check the schema marker, writing it if the index is new.
    pub fn verify(&self, name: &str, version: u32) -> Result<()> {
        let key = layout::version_key();
        match self.get(&key)? {
            None => {
                let marker = SchemaMarker { name: name.to_string(), version };
                let mut batch = IndexBatch::new();
                batch.put(&key, &bincode::serialize(&marker)?);
                self.write(batch)?;
                log::debug!("Initialized index schema {} v{}", name, version);
                Ok(())
            }
            Some(raw) => {
                let found: SchemaMarker = bincode::deserialize(&raw)?;
                if found.name != name || found.version != version {
                    return Err(Error::SchemaMismatch {
                        expected_name: name.to_string(),
                        expected_version: version,
                        found_name: found.name,
                        found_version: found.version,
                    });
                }
                Ok(())
            }
        }
    }
}
