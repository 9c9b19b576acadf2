//! Configuration options for the block store.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default upper bound on the size of a single flat file (128 MiB).
pub const DEFAULT_MAX_FILE_LENGTH: u64 = 128 * 1024 * 1024;

/// Default cache size handed to the index database (16 MiB).
pub const DEFAULT_CACHE_SIZE: usize = 16 * 1024 * 1024;

/// Network whose magic number frames every record on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Main network.
    #[default]
    Main,
    /// Public test network.
    Testnet,
    /// Local regression test network.
    Regtest,
    /// Simulation network.
    Simnet,
}

impl Network {
    /// The 4-byte magic constant, written little-endian at the start of frames.
    pub fn magic(self) -> u32 {
        match self {
            Network::Main => 0xd9b4_bef9,
            Network::Testnet => 0x0709_110b,
            Network::Regtest => 0xdab5_bffa,
            Network::Simnet => 0x1214_1c16,
        }
    }
}

/// Configuration options for opening a block store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Absolute data directory. Flat files live directly inside it and the
    /// index database under `index/`.
    pub location: PathBuf,

    /// Maximum length of a single flat file in bytes.
    /// Default: 128MB
    pub max_file_length: u64,

    /// Network whose magic frames every record.
    /// Default: Network::Main
    pub network: Network,

    /// Cache size handed to the index database (in bytes).
    /// Default: 16MB
    pub cache_size: usize,

    /// Keep the index database in memory.
    /// `create()` picks the key-value backend when this is set.
    /// Default: false
    pub memory: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            location: PathBuf::new(),
            max_file_length: DEFAULT_MAX_FILE_LENGTH,
            network: Network::Main,
            cache_size: DEFAULT_CACHE_SIZE,
            memory: false,
        }
    }
}

impl Options {
    /// Creates options rooted at `location` with default values.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self { location: location.into(), ..Self::default() }
    }

    /// Creates options for a node prefix; blocks live under `<prefix>/blocks`.
    pub fn from_prefix(prefix: impl AsRef<Path>) -> Self {
        Self::new(prefix.as_ref().join("blocks"))
    }

    /// Parses options from a JSON document and validates them.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)
            .map_err(|e| Error::invalid_argument(format!("Invalid options JSON: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Sets the data directory.
    pub fn location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the maximum flat file length.
    pub fn max_file_length(mut self, length: u64) -> Self {
        self.max_file_length = length;
        self
    }

    /// Sets the network.
    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Sets the index database cache size.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Keeps the index database in memory.
    pub fn memory(mut self, value: bool) -> Self {
        self.memory = value;
        self
    }

    /// Path of the index database file.
    pub fn index_path(&self) -> PathBuf {
        self.location.join("index").join("index.redb")
    }

    /// `max_file_length` narrowed to the on-disk width.
    ///
    /// Only meaningful after `validate()` has succeeded.
    pub(crate) fn file_capacity(&self) -> u32 {
        u32::try_from(self.max_file_length).unwrap_or(u32::MAX)
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.memory && !self.location.is_absolute() {
            return Err(Error::invalid_argument(format!(
                "location must be an absolute path: {:?}",
                self.location
            )));
        }
        if self.max_file_length == 0 {
            return Err(Error::invalid_argument("max_file_length must be > 0"));
        }
        // Offsets and lengths are stored as u32 on disk.
        if self.max_file_length > u32::MAX as u64 {
            return Err(Error::invalid_argument(format!(
                "max_file_length must be <= {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}
