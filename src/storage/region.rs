//! Mapped slot region
//!
//! Owns the memory mapping of a store file and exposes slots by index.
//! Nothing outside this module sees an address; callers name slots by their
//! zero-based index and get bounds-checked byte slices back.
//!
//! Slot accessors panic when `slot >= capacity`: an out-of-range index is a
//! bug in the caller, not a runtime condition.
//!
//! Dropping the region unmaps it. Slices borrowed from it cannot outlive it.

use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::MmapMut;

use crate::error::{LruError, Result};
use crate::fingerprint::EMPTY_FINGERPRINT;

use super::layout::{FileHeader, HEADER_SIZE};

const FP_LEN: usize = 8;
const ATIME_LEN: usize = 4;
const VALUE_OFFSET: usize = FP_LEN + ATIME_LEN;

/// An owned copy of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub fingerprint: u64,
    pub value: Vec<u8>,
    pub last_access_time: u32,
}

/// A store file mapped read-write into memory
#[derive(Debug)]
pub struct MappedRegion {
    _file: File,
    mmap: MmapMut,
    header: FileHeader,
}

impl MappedRegion {
    /// Map an existing store file after validating its header and length
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(LruError::Format(format!(
                "file length {} is shorter than the {}-byte header",
                file_len, HEADER_SIZE
            )));
        }

        // SAFETY: mapping a file is unsafe because another process could
        // truncate or rewrite it underneath us. Store files are owned by a
        // single process at a time, the mapping lives exactly as long as this
        // struct, and the length was checked before any slot is touched.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let header = FileHeader::decode(&mmap[..HEADER_SIZE])?;
        header.check_file_len(file_len)?;

        Ok(Self {
            _file: file,
            mmap,
            header,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn capacity(&self) -> usize {
        self.header.capacity()
    }

    pub fn value_size(&self) -> usize {
        self.header.value_size()
    }

    // =========================================================================
    // Positional access
    // =========================================================================

    /// Write fingerprint, value, and timestamp into `slot`.
    ///
    /// `value` shorter than the value size is zero-padded.
    pub fn write(&mut self, slot: usize, fingerprint: u64, value: &[u8], last_access_time: u32) {
        let value_size = self.value_size();
        debug_assert!(
            value.len() <= value_size,
            "value of {} bytes exceeds value size {}",
            value.len(),
            value_size
        );

        let bytes = self.slot_mut(slot);
        bytes[..FP_LEN].copy_from_slice(&fingerprint.to_le_bytes());
        bytes[FP_LEN..VALUE_OFFSET].copy_from_slice(&last_access_time.to_le_bytes());
        let (head, pad) = bytes[VALUE_OFFSET..].split_at_mut(value.len());
        head.copy_from_slice(value);
        pad.fill(0);
    }

    /// Read an owned copy of `slot`
    pub fn read(&self, slot: usize) -> SlotRecord {
        SlotRecord {
            fingerprint: self.fingerprint(slot),
            value: self.value(slot).to_vec(),
            last_access_time: self.timestamp(slot),
        }
    }

    pub fn fingerprint(&self, slot: usize) -> u64 {
        let bytes = self.slot(slot);
        u64::from_le_bytes(bytes[..FP_LEN].try_into().expect("8-byte field"))
    }

    pub fn timestamp(&self, slot: usize) -> u32 {
        let bytes = self.slot(slot);
        u32::from_le_bytes(bytes[FP_LEN..VALUE_OFFSET].try_into().expect("4-byte field"))
    }

    pub fn value(&self, slot: usize) -> &[u8] {
        &self.slot(slot)[VALUE_OFFSET..]
    }

    pub fn set_timestamp(&mut self, slot: usize, last_access_time: u32) {
        self.slot_mut(slot)[FP_LEN..VALUE_OFFSET].copy_from_slice(&last_access_time.to_le_bytes());
    }

    pub fn is_empty_slot(&self, slot: usize) -> bool {
        self.fingerprint(slot) == EMPTY_FINGERPRINT
    }

    /// Mark `slot` empty. Only the fingerprint is reset.
    pub fn clear_slot(&mut self, slot: usize) {
        self.slot_mut(slot)[..FP_LEN].copy_from_slice(&EMPTY_FINGERPRINT.to_le_bytes());
    }

    /// Zero every slot, leaving the header intact
    pub fn zero_slots(&mut self) {
        self.mmap[HEADER_SIZE..].fill(0);
    }

    /// Flush dirty pages to the file
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        assert!(
            slot < self.capacity(),
            "slot {} out of bounds (capacity={})",
            slot,
            self.capacity()
        );
        let item_size = self.header.item_size();
        let start = HEADER_SIZE + slot * item_size;
        start..start + item_size
    }

    fn slot(&self, slot: usize) -> &[u8] {
        let range = self.slot_range(slot);
        &self.mmap[range]
    }

    fn slot_mut(&mut self, slot: usize) -> &mut [u8] {
        let range = self.slot_range(slot);
        &mut self.mmap[range]
    }
}
