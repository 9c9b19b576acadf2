//! Error types for the block store.

use crate::types::DataKind;
use std::io;
use thiserror::Error;

/// The result type used throughout the block store.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for block store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The index database reported an error.
    #[error("Index database error: {0}")]
    Index(#[from] redb::Error),

    /// An invalid argument or configuration value was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store is in a state that cannot service the request.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A write to this kind is already in flight.
    #[error("Concurrent write to {0} store")]
    Busy(DataKind),

    /// The OS wrote fewer bytes than requested.
    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        /// Bytes requested.
        expected: usize,
        /// Bytes the OS reported writing.
        actual: usize,
    },

    /// Fewer bytes were read than requested.
    #[error("Short read: expected {expected} bytes, read {actual}")]
    ShortRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// A read range extends past the end of the stored payload.
    #[error("Out-of-bounds read: offset {offset} + length {length} exceeds size {size}")]
    OutOfBounds {
        /// Requested offset into the payload.
        offset: u32,
        /// Requested length.
        length: u32,
        /// Recorded payload size.
        size: u32,
    },

    /// Stored data could not be decoded.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// The index database was created by an incompatible store.
    #[error(
        "Index schema mismatch: expected {expected_name} v{expected_version}, \
         found {found_name} v{found_version}"
    )]
    SchemaMismatch {
        /// Name this store writes.
        expected_name: String,
        /// Version this store writes.
        expected_version: u32,
        /// Name found on disk.
        found_name: String,
        /// Version found on disk.
        found_version: u32,
    },

    /// The store has not been opened, or has been closed.
    #[error("Block store is not open")]
    Closed,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redb::DatabaseError> for Error {
    fn from(err: redb::DatabaseError) -> Self {
        Error::Index(err.into())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(err: redb::TransactionError) -> Self {
        Error::Index(err.into())
    }
}

impl From<redb::TableError> for Error {
    fn from(err: redb::TableError) -> Self {
        Error::Index(err.into())
    }
}

impl From<redb::StorageError> for Error {
    fn from(err: redb::StorageError) -> Self {
        Error::Index(err.into())
    }
}

impl From<redb::CommitError> for Error {
    fn from(err: redb::CommitError) -> Self {
        Error::Index(err.into())
    }
}
