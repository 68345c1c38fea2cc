//! Store file layout
//!
//! Header encoding, size arithmetic, and creation of empty store files.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LruError, Result};

/// Header size: ValueSize (4) + Capacity (4) + Seed (4) = 12 bytes
pub const HEADER_SIZE: usize = 12;

/// Per-slot bytes besides the value: Fingerprint (8) + Atime (4)
pub const SLOT_OVERHEAD: usize = 12;

/// Zero-fill chunk used while formatting a new file
const ZERO_CHUNK: usize = 64 * 1024;

/// Fixed header at the start of every store file.
///
/// Field order is the on-disk order; bincode's default fixed-int
/// little-endian encoding produces exactly `HEADER_SIZE` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub value_size: u32,
    pub capacity: u32,
    pub seed: u32,
}

impl FileHeader {
    pub fn new(value_size: usize, capacity: usize, seed: u32) -> Result<Self> {
        let value_size = u32::try_from(value_size).map_err(|_| {
            LruError::Config(format!("value size {} does not fit in 32 bits", value_size))
        })?;
        let capacity = u32::try_from(capacity).map_err(|_| {
            LruError::Config(format!("capacity {} does not fit in 32 bits", capacity))
        })?;
        if capacity == 0 {
            return Err(LruError::Config("capacity must be at least 1".to_string()));
        }
        Ok(Self {
            value_size,
            capacity,
            seed,
        })
    }

    pub fn value_size(&self) -> usize {
        self.value_size as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Bytes per slot: value size + 12
    pub fn item_size(&self) -> usize {
        self.value_size() + SLOT_OVERHEAD
    }

    /// Exact length a file with this header must have
    pub fn file_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.capacity as u64 * self.item_size() as u64
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(self)?;
        debug_assert_eq!(bytes.len(), HEADER_SIZE);
        Ok(bytes)
    }

    /// Decode a header and check that it describes a usable store
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LruError::Format(format!(
                "header truncated: {} of {} bytes",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        let header: FileHeader = bincode::deserialize(&bytes[..HEADER_SIZE])?;
        if header.capacity == 0 {
            return Err(LruError::Format("header declares zero capacity".to_string()));
        }
        Ok(header)
    }

    /// Check a file length against the header
    pub fn check_file_len(&self, actual: u64) -> Result<()> {
        let expected = self.file_len();
        if actual != expected {
            return Err(LruError::Format(format!(
                "file length {} does not match expected {} (capacity={}, value_size={})",
                actual, expected, self.capacity, self.value_size
            )));
        }
        Ok(())
    }
}

/// Create an empty store file: header followed by `capacity` zeroed slots.
///
/// Any existing file at `path` is truncated and overwritten.
pub fn create_storage_file(
    path: &Path,
    value_size: usize,
    capacity: usize,
    seed: u32,
) -> Result<FileHeader> {
    let header = FileHeader::new(value_size, capacity, seed)?;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(&header.encode()?)?;

    let zeros = [0u8; ZERO_CHUNK];
    let mut remaining = header.file_len() - HEADER_SIZE as u64;
    while remaining > 0 {
        let n = remaining.min(ZERO_CHUNK as u64) as usize;
        writer.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    writer.flush()?;

    let file: File = writer
        .into_inner()
        .map_err(|e| LruError::Io(e.into_error()))?;
    file.sync_all()?;

    // Guard against short writes on odd filesystems
    header.check_file_len(file.metadata()?.len())?;

    Ok(header)
}
