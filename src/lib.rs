//! # blockstore - Block Storage Engine for a Blockchain Node
//!
//! Persists raw blocks, merkle blocks, undo data and compact filters, and
//! retrieves them by hash. Each [`DataKind`] is an independent namespace.
//!
//! ## Architecture
//!
//! - **Flat-file backend** ([`FileBlockStore`]): payloads are framed with the
//!   network magic and appended to rotating fixed-capacity files; an index
//!   database maps hashes to file locations
//! - **Key-value backend** ([`KvBlockStore`]): payloads stored directly as
//!   index database values
//! - **Index database** ([`index::IndexDb`]): embedded `redb` table; every
//!   logical operation commits as one atomic batch
//! - **Recovery**: on open, flat files without index entries are rescanned
//!   byte by byte for frames and the index is rebuilt
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use blockstore::{hash256, BlockStore, Options};
//!
//! # fn main() -> Result<(), blockstore::Error> {
//! let mut store = blockstore::create(Options::from_prefix("/var/lib/node"))?;
//! store.ensure()?;
//! store.open()?;
//!
//! let block = vec![0u8; 285];
//! let hash = hash256(&block[..80]);
//!
//! store.write_block(&hash, &block)?;
//! assert!(store.has_block(&hash)?);
//!
//! // Read the 80-byte header only.
//! let header = store.read(blockstore::DataKind::Block, &hash, Some(0), Some(80))?;
//! assert_eq!(header.map(|h| h.len()), Some(80));
//!
//! store.prune_block(&hash)?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod records;
pub mod store;
pub mod types;

// Re-exports
pub use config::{Network, Options};
pub use error::{Error, Result};
pub use hash::hash256;
pub use records::{BlockRecord, FileRecord};
pub use store::{create, AnyBlockStore, BlockStore, FileBlockStore, KvBlockStore};
pub use types::{DataKind, Hash256};
