//! IndexBatch groups index mutations that must land together.
//!
//! A batch is committed as a single index-database transaction: after a
//! crash either every operation in it is visible or none is.
//!
//! # Example
//!
//! ```
//! use blockstore::index::IndexBatch;
//!
//! let mut batch = IndexBatch::new();
//! batch.put(b"key1", b"value1");
//! batch.delete(b"key2");
//! assert_eq!(batch.len(), 2);
//! ```

/// A single mutation in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Put operation with key and value
    Put {
        /// Key to insert
        key: Vec<u8>,
        /// Value to associate with the key
        value: Vec<u8>,
    },
    /// Delete operation with key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}

/// An ordered list of index mutations applied atomically.
#[derive(Debug, Default)]
pub struct IndexBatch {
    operations: Vec<BatchOp>,
}

impl IndexBatch {
    /// Creates a new empty batch.
    pub fn new() -> Self {
        Self { operations: Vec::new() }
    }

    /// Adds a Put operation to the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put { key: key.to_vec(), value: value.to_vec() });
    }

    /// Adds a Delete operation to the batch.
    pub fn delete(&mut self, key: &[u8]) {
        self.operations.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Returns the number of operations in the batch.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the batch contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns an iterator over the operations in the batch.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.operations.iter()
    }
}
