//! Flat-file backend.
//!
//! Payloads are appended as framed records to a sequence of files per kind,
//! `<prefix><nnnnn>.dat` under the data directory. The index database maps
//! each hash to a [`BlockRecord`] and each file to a [`FileRecord`].
//!
//! ## Write path
//!
//! 1. Reject block and merkle block payloads shorter than their 80-byte
//!    header, then return `false` if the hash is already indexed
//! 2. Allocate: append to the latest file, or roll over to a fresh one when
//!    the frame would push it past capacity
//! 3. Write the frame header and payload at the file's `used` offset
//! 4. Commit block record, file record and latest pointer in one batch
//!
//! A crash before step 4 leaves orphaned bytes in a file, never an index
//! entry pointing at missing data.
//!
//! ## Pruning
//!
//! `FileRecord::blocks` counts live records in a file. Pruning removes the
//! block record at once; the file itself is unlinked only when the count
//! drains to zero.
//!
//! ## Recovery
//!
//! On open, each recoverable kind's files are compared against the index.
//! If any file lacks a usage record, every file of that kind is rescanned
//! with [`FrameScanner`] and its records rebuilt.

pub mod frame;
pub mod scan;

pub use frame::{header_size, FrameHeader, FRAME_HEADER_SIZE, HASHED_FRAME_HEADER_SIZE};
pub use scan::{FrameScanner, ScannedFrame};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::index::{layout, IndexBatch, IndexDb};
use crate::records::{BlockRecord, FileRecord};
use crate::store::{ensure_dirs, open_index, payload_length, resolve_range, BlockStore};
use crate::types::{DataKind, Hash256};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Highest file number representable in a five-digit file name.
pub const MAX_FILE_NUMBER: u32 = 99_999;

/// File name for file `file` of `kind`, e.g. `blk00042.dat`.
pub fn file_name(kind: DataKind, file: u32) -> String {
    format!("{}{:05}.dat", kind.prefix(), file)
}

/// Parse a file number out of a file name of `kind`.
pub fn parse_file_name(kind: DataKind, name: &str) -> Option<u32> {
    let digits = name.strip_prefix(kind.prefix())?.strip_suffix(".dat")?;
    if digits.len() != 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Where the next frame of a kind goes.
struct Allocation {
    file: u32,
    record: FileRecord,
    path: PathBuf,
}

/// Block store that appends framed payloads to rotating flat files.
///
/// # Thread Safety
///
/// All data operations take `&self`. At most one write per kind may be in
/// flight; a second concurrent write to the same kind fails with
/// [`Error::Busy`] instead of queueing. Writes to different kinds, reads and
/// `has` never wait on each other.
pub struct FileBlockStore {
    /// Configuration options
    options: Options,

    /// Index database, present while open
    index: Option<IndexDb>,

    /// Per-kind busy flag, held for the whole of a write
    writing: [Mutex<()>; 4],

    /// Per-kind guard over file record updates and file creation/unlink
    usage: [Mutex<()>; 4],
}

impl FileBlockStore {
    /// Schema name recorded in the index.
    pub const NAME: &'static str = "fileblockstore";

    /// Create a closed store. Call `ensure()` and `open()` before use.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        if !options.location.is_absolute() {
            return Err(Error::invalid_argument(format!(
                "flat-file store needs an absolute location: {:?}",
                options.location
            )));
        }

        Ok(Self {
            options,
            index: None,
            writing: std::array::from_fn(|_| Mutex::new(())),
            usage: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    /// The options this store was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether `open()` has succeeded and `close()` hasn't been called since.
    pub fn is_open(&self) -> bool {
        self.index.is_some()
    }

    /// Path of file `file` of `kind`.
    pub fn file_path(&self, kind: DataKind, file: u32) -> PathBuf {
        self.options.location.join(file_name(kind, file))
    }

    /// Location record for `(kind, hash)`.
    pub fn block_record(&self, kind: DataKind, hash: &Hash256) -> Result<Option<BlockRecord>> {
        get_block_record(self.index()?, kind, hash)
    }

    /// Usage record for `(kind, file)`.
    pub fn file_record(&self, kind: DataKind, file: u32) -> Result<Option<FileRecord>> {
        get_file_record(self.index()?, kind, file)
    }

    /// File currently being appended to for `kind`.
    pub fn latest_file(&self, kind: DataKind) -> Result<u32> {
        get_latest_file(self.index()?, kind)
    }

    /// Every location record of `kind`, ordered by hash.
    pub fn block_records(&self, kind: DataKind) -> Result<Vec<(Hash256, BlockRecord)>> {
        let index = self.index()?;
        let mut records = Vec::new();
        for (key, value) in index.scan_prefix(&layout::record_prefix(kind))? {
            let hash = layout::parse_record_key(kind, &key)
                .ok_or_else(|| Error::corruption(format!("Bad {} record key", kind)))?;
            records.push((hash, BlockRecord::decode(&value)?));
        }
        Ok(records)
    }

    /// Rescan every file of `kind` and rebuild its index entries.
    ///
    /// Unlike the check run by `open()`, this works for every kind,
    /// including filters.
    pub fn reindex(&self, kind: DataKind) -> Result<()> {
        let index = self.index()?;
        let _writing = self.writing[kind.index()].lock();
        let _usage = self.usage[kind.index()].lock();
        let files = self.list_files(kind)?;
        self.reindex_files(index, kind, &files)
    }

    fn index(&self) -> Result<&IndexDb> {
        self.index.as_ref().ok_or(Error::Closed)
    }

    /// File numbers of `kind` present on disk, ascending.
    fn list_files(&self, kind: DataKind) -> Result<Vec<u32>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.options.location)? {
            let entry = entry?;
            if let Some(file) = entry.file_name().to_str().and_then(|n| parse_file_name(kind, n)) {
                files.push(file);
            }
        }
        files.sort_unstable();
        Ok(files)
    }

    /// Report whether any on-disk file of `kind` lacks a usage record,
    /// along with every file number found.
    fn check(&self, index: &IndexDb, kind: DataKind) -> Result<(bool, Vec<u32>)> {
        let files = self.list_files(kind)?;
        for &file in &files {
            if !index.has(&layout::usage_key(kind, file))? {
                log::warn!("Missing usage record for {} file {}", kind, file);
                return Ok((true, files));
            }
        }
        Ok((false, files))
    }

    fn reindex_files(&self, index: &IndexDb, kind: DataKind, files: &[u32]) -> Result<()> {
        let magic = self.options.network.magic();
        let capacity = self.options.file_capacity();

        for &file in files {
            let data = fs::read(self.file_path(kind, file))?;
            let mut scanner = FrameScanner::new(&data, kind, magic, file);

            let mut batch = IndexBatch::new();
            let mut blocks = 0u32;
            for frame in scanner.by_ref() {
                batch.put(&layout::record_key(kind, &frame.hash), &frame.record.encode());
                blocks += 1;
            }

            let used = u32::try_from(scanner.offset()).map_err(|_| {
                Error::corruption(format!("{} file {} is larger than 4GiB", kind, file))
            })?;
            let record = FileRecord { blocks, used, capacity };
            batch.put(&layout::usage_key(kind, file), &record.encode());
            index.write(batch)?;

            log::info!("Indexed {} {} records in file {}", blocks, kind, file);
        }

        if let Some(&last) = files.iter().max() {
            let mut batch = IndexBatch::new();
            batch.put(&layout::latest_key(kind), &layout::encode_file_number(last));
            index.write(batch)?;
        }

        Ok(())
    }

    /// Pick the file the next `frame_length`-byte frame of `kind` goes to.
    ///
    /// Caller must hold the kind's usage lock.
    fn allocate(&self, index: &IndexDb, kind: DataKind, frame_length: u32) -> Result<Allocation> {
        let capacity = self.options.file_capacity();
        if frame_length > capacity {
            return Err(Error::invalid_argument(format!(
                "{} frame of {} bytes exceeds max file length {}",
                kind, frame_length, capacity
            )));
        }

        let mut file = get_latest_file(index, kind)?;
        let mut touch = false;
        let mut record = match get_file_record(index, kind, file)? {
            Some(record) => record,
            None => {
                touch = true;
                FileRecord::empty(capacity)
            }
        };

        if !record.fits(frame_length) {
            file = file.checked_add(1).filter(|f| *f <= MAX_FILE_NUMBER).ok_or_else(|| {
                Error::invalid_state(format!("{} file numbers exhausted", kind))
            })?;
            record = FileRecord::empty(capacity);
            touch = true;
            log::info!("Rolling {} storage over to file {}", kind, file);
        }

        let path = self.file_path(kind, file);
        if touch {
            OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
            log::debug!("Created {:?}", path);
        }

        Ok(Allocation { file, record, path })
    }
}

impl BlockStore for FileBlockStore {
    fn ensure(&self) -> Result<()> {
        ensure_dirs(&self.options)
    }

    fn open(&mut self) -> Result<()> {
        if self.index.is_some() {
            return Ok(());
        }

        log::info!("Opening FileBlockStore at {:?}", self.options.location);
        let index = open_index(&self.options, Self::NAME)?;

        for kind in DataKind::ALL.into_iter().filter(|k| k.is_recoverable()) {
            let (missing, files) = self.check(&index, kind)?;
            if missing {
                log::info!("Reindexing {} {} files", files.len(), kind);
                self.reindex_files(&index, kind, &files)?;
            }
        }

        self.index = Some(index);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(index) = self.index.take() {
            index.close();
            log::info!("Closed FileBlockStore at {:?}", self.options.location);
        }
        Ok(())
    }

    fn write(&self, kind: DataKind, hash: &Hash256, data: &[u8]) -> Result<bool> {
        let index = self.index()?;
        let length = payload_length(kind, data)?;
        let frame_length = u32::try_from(header_size(kind) + data.len()).map_err(|_| {
            Error::invalid_argument(format!("{} frame of {} bytes is too large", kind, data.len()))
        })?;

        let _writing = self.writing[kind.index()].try_lock().ok_or(Error::Busy(kind))?;

        if index.has(&layout::record_key(kind, hash))? {
            return Ok(false);
        }

        let header = FrameHeader::new(kind, self.options.network.magic(), length, hash).encode();

        let _usage = self.usage[kind.index()].lock();
        let Allocation { file, mut record, path } = self.allocate(index, kind, frame_length)?;

        // Cannot overflow: used + frame_length <= capacity <= u32::MAX.
        let position = record.used + header.len() as u32;
        {
            let mut fd = OpenOptions::new().write(true).open(&path)?;
            write_at(&mut fd, record.used as u64, &header)?;
            write_at(&mut fd, position as u64, data)?;
        }

        record.blocks += 1;
        record.used += frame_length;

        let block = BlockRecord::new(file, position, length);
        let mut batch = IndexBatch::new();
        batch.put(&layout::record_key(kind, hash), &block.encode());
        batch.put(&layout::usage_key(kind, file), &record.encode());
        batch.put(&layout::latest_key(kind), &layout::encode_file_number(file));
        index.write(batch)?;

        log::debug!("Wrote {} {} ({} bytes) to file {} at {}", kind, hash, length, file, position);
        Ok(true)
    }

    fn read(
        &self,
        kind: DataKind,
        hash: &Hash256,
        offset: Option<u32>,
        length: Option<u32>,
    ) -> Result<Option<Vec<u8>>> {
        let index = self.index()?;
        let block = match get_block_record(index, kind, hash)? {
            Some(block) => block,
            None => return Ok(None),
        };

        let (start, len) = resolve_range(block.length, offset, length)?;
        let mut buf = vec![0u8; len as usize];
        {
            let mut fd = File::open(self.file_path(kind, block.file))?;
            read_at(&mut fd, block.position as u64 + start as u64, &mut buf)?;
        }

        Ok(Some(buf))
    }

    fn has(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        self.index()?.has(&layout::record_key(kind, hash))
    }

    fn prune(&self, kind: DataKind, hash: &Hash256) -> Result<bool> {
        let index = self.index()?;
        let _usage = self.usage[kind.index()].lock();

        let block = match get_block_record(index, kind, hash)? {
            Some(block) => block,
            None => return Ok(false),
        };
        let mut record = match get_file_record(index, kind, block.file)? {
            Some(record) => record,
            None => return Ok(false),
        };

        record.blocks = record.blocks.saturating_sub(1);

        let usage_key = layout::usage_key(kind, block.file);
        let mut batch = IndexBatch::new();
        batch.delete(&layout::record_key(kind, hash));
        if record.blocks == 0 {
            batch.delete(&usage_key);
        } else {
            batch.put(&usage_key, &record.encode());
        }
        index.write(batch)?;

        log::debug!("Pruned {} {} from file {}", kind, hash, block.file);

        if record.blocks == 0 {
            remove_file(&self.file_path(kind, block.file))?;
            log::info!("Removed {} file {}", kind, block.file);
        }

        Ok(true)
    }
}

fn get_block_record(index: &IndexDb, kind: DataKind, hash: &Hash256) -> Result<Option<BlockRecord>> {
    index.get(&layout::record_key(kind, hash))?.map(|raw| BlockRecord::decode(&raw)).transpose()
}

fn get_file_record(index: &IndexDb, kind: DataKind, file: u32) -> Result<Option<FileRecord>> {
    index.get(&layout::usage_key(kind, file))?.map(|raw| FileRecord::decode(&raw)).transpose()
}

fn get_latest_file(index: &IndexDb, kind: DataKind) -> Result<u32> {
    match index.get(&layout::latest_key(kind))? {
        Some(raw) => layout::decode_file_number(&raw)
            .ok_or_else(|| Error::corruption(format!("Bad latest file pointer for {}", kind))),
        None => Ok(0),
    }
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("File {:?} already removed", path);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write all of `buf` at `offset`, failing if the OS accepts fewer bytes.
fn write_at(file: &mut File, offset: u64, buf: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    let mut written = 0;
    while written < buf.len() {
        match file.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if written != buf.len() {
        return Err(Error::ShortWrite { expected: buf.len(), actual: written });
    }
    Ok(())
}

/// Fill `buf` from `offset`, failing if the file ends first.
fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    let mut read = 0;
    while read < buf.len() {
        match file.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if read != buf.len() {
        return Err(Error::ShortRead { expected: buf.len(), actual: read });
    }
    Ok(())
}
