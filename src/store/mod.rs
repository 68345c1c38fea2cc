//! Store Module
//!
//! The public face of the cache: lifecycle plus key-based access.
//!
//! ## Responsibilities
//! - Open, create, recover (by recreation), and close store files
//! - Rebuild the recency index on every open
//! - Key-based lookup/insert/touch/delete through the index
//! - Raw positional slot access for bulk population
//!
//! Maintenance operations (age-based deletion, clear, merge) live in
//! `maintenance.rs`.

mod maintenance;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{LruError, Result};
use crate::fingerprint::{fingerprint, EMPTY_FINGERPRINT};
use crate::index::{Insertion, RecencyIndex};
use crate::storage::{create_storage_file, MappedRegion, SlotRecord, SLOT_OVERHEAD};

pub use maintenance::UNTOUCHED_LIMIT_SECS;

/// A persistent, fixed-capacity LRU map from string keys to fixed-size values.
///
/// ## Concurrency Model
///
/// None. A store has a single owner; callers that share one across threads
/// must serialize access themselves (see `SharedStore`). Two processes
/// opening the same file will corrupt each other's ordering.
///
/// ## Keys
///
/// Keys are reduced to 64-bit seeded fingerprints and never stored. Distinct
/// keys with equal fingerprints overwrite each other; this is accepted.
pub struct LruStore {
    /// Path of the open file (empty when closed)
    filename: PathBuf,

    /// The mapping, `None` while closed
    region: Option<MappedRegion>,

    /// Fingerprint map + recency list over `region`
    index: RecencyIndex,

    /// Source of access timestamps
    clock: Arc<dyn Clock>,
}

impl Default for LruStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LruStore {
    /// An unopened store
    pub fn new() -> Self {
        Self {
            filename: PathBuf::new(),
            region: None,
            index: RecencyIndex::with_capacity(0),
            clock: Arc::new(SystemClock),
        }
    }

    /// Open an existing store file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self::new();
        store.open(path)?;
        Ok(store)
    }

    /// Open `path` if it matches the parameters, otherwise recreate it
    pub fn create_with_params(
        path: impl AsRef<Path>,
        value_size: usize,
        capacity: usize,
        seed: u32,
    ) -> Result<Self> {
        let mut store = Self::new();
        store.open_or_create(path, value_size, capacity, seed)?;
        Ok(store)
    }

    /// `create_with_params` driven by a `StoreConfig`
    pub fn create_with(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        Self::create_with_params(&config.path, config.value_size, config.capacity, config.seed)
    }

    /// Write an empty store file. Fails if it cannot be written in full.
    pub fn create_storage_file(
        path: impl AsRef<Path>,
        value_size: usize,
        capacity: usize,
        seed: u32,
    ) -> Result<()> {
        let path = path.as_ref();
        create_storage_file(path, value_size, capacity, seed)?;
        info!(path = %path.display(), value_size, capacity, seed, "created store file");
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Map `path` and rebuild the index from its slots.
    ///
    /// Any store already open on `self` is closed first.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.close()?;

        let path = path.as_ref();
        let mut region = MappedRegion::open(path)?;
        let index = RecencyIndex::rebuild(&mut region);

        info!(
            path = %path.display(),
            capacity = region.capacity(),
            value_size = region.value_size(),
            used = index.len(),
            "opened store"
        );

        self.filename = path.to_path_buf();
        self.region = Some(region);
        self.index = index;
        Ok(())
    }

    /// Open `path`, recreating it when it is missing, unreadable, truncated,
    /// or was created with different parameters.
    ///
    /// A damaged cache degrades to an empty one; only a failure to write the
    /// fresh file is reported.
    pub fn open_or_create(
        &mut self,
        path: impl AsRef<Path>,
        value_size: usize,
        capacity: usize,
        seed: u32,
    ) -> Result<()> {
        let path = path.as_ref();

        match self.open(path) {
            Ok(()) => {
                if self.value_size() == value_size
                    && self.size() == capacity
                    && self.seed() == seed
                {
                    return Ok(());
                }
                warn!(
                    path = %path.display(),
                    found_value_size = self.value_size(),
                    found_capacity = self.size(),
                    found_seed = self.seed(),
                    value_size,
                    capacity,
                    seed,
                    "store parameters changed, recreating"
                );
                if let Err(e) = self.close() {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "flush failed while closing outdated store"
                    );
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open store, recreating");
            }
        }

        Self::create_storage_file(path, value_size, capacity, seed)?;
        self.open(path)
    }

    /// `open_or_create` driven by a `StoreConfig`
    pub fn open_or_create_with(&mut self, config: &StoreConfig) -> Result<()> {
        config.validate()?;
        self.open_or_create(&config.path, config.value_size, config.capacity, config.seed)
    }

    /// Flush and unmap. Safe to call repeatedly or on a never-opened store.
    pub fn close(&mut self) -> Result<()> {
        let Some(region) = self.region.take() else {
            return Ok(());
        };
        self.index = RecencyIndex::with_capacity(0);
        let filename = std::mem::take(&mut self.filename);

        region.flush()?;
        debug!(path = %filename.display(), "closed store");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }

    /// Sync dirty pages of the mapping to disk
    pub fn flush(&self) -> Result<()> {
        match &self.region {
            Some(region) => region.flush(),
            None => Ok(()),
        }
    }

    /// Replace the time source used for access timestamps
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    // =========================================================================
    // Key-based access
    // =========================================================================

    /// Value for `key`, without changing recency
    pub fn lookup(&self, key: &str) -> Option<&[u8]> {
        self.lookup_with_time(key).map(|(value, _)| value)
    }

    /// Value and last access time for `key`, without changing recency
    pub fn lookup_with_time(&self, key: &str) -> Option<(&[u8], u32)> {
        let region = self.region.as_ref()?;
        let slot = self.index.slot_of(fingerprint(key, region.header().seed))?;
        Some((region.value(slot), region.timestamp(slot)))
    }

    /// Value for `key` as text, with trailing NUL padding removed
    pub fn lookup_as_string(&self, key: &str) -> Option<Cow<'_, str>> {
        let value = self.lookup(key)?;
        let end = value.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Some(String::from_utf8_lossy(&value[..end]))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Insert or overwrite `key`, making it the most recently used entry.
    ///
    /// When the store is full and no deleted slot is available, the least
    /// recently used entry is evicted. Values shorter than `value_size` are
    /// zero-padded.
    pub fn insert(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.check_value(value)?;
        let now = self.now();
        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        let fp = fingerprint(key, region.header().seed);

        match self.index.insert(region, fp, value, now) {
            Some(Insertion::Evicted { fingerprint, .. }) => {
                debug!(key, evicted = fingerprint, "insert evicted an entry");
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(LruError::NoSlot),
        }
    }

    /// Overwrite `key` only if it is already present.
    ///
    /// Despite the name this never adds a new entry: an absent key is left
    /// absent and `Ok(false)` is returned.
    pub fn try_insert(&mut self, key: &str, value: &[u8]) -> Result<bool> {
        self.check_value(value)?;
        let region = self.region.as_ref().ok_or(LruError::Closed)?;
        if self.index.slot_of(fingerprint(key, region.header().seed)).is_none() {
            return Ok(false);
        }
        self.insert(key, value)?;
        Ok(true)
    }

    /// Refresh `key`'s timestamp and make it most recently used.
    /// `Ok(false)` if absent.
    pub fn touch(&mut self, key: &str) -> Result<bool> {
        let now = self.now();
        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        let fp = fingerprint(key, region.header().seed);
        Ok(self.index.touch(region, fp, now))
    }

    /// Remove `key`. Deleting an absent key succeeds with `Ok(false)`.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        let fp = fingerprint(key, region.header().seed);
        Ok(self.index.remove(region, fp))
    }

    // =========================================================================
    // Raw positional access
    // =========================================================================

    /// Write slot `slot` directly, bypassing the index.
    ///
    /// For bulk population only; the index does not see the entry until the
    /// store is reopened. An indexed entry stored at `slot` is dropped, and a
    /// slot left holding data is not handed to new keys until then (unless
    /// nothing else can be evicted).
    ///
    /// # Panics
    /// If the store is closed or `slot >= size()`.
    pub fn write(
        &mut self,
        slot: usize,
        fingerprint: u64,
        value: &[u8],
        last_access_time: u32,
    ) -> Result<()> {
        let region = self.region.as_mut().expect("store is not open");
        if value.len() > region.value_size() {
            return Err(LruError::ValueTooLarge {
                value_size: region.value_size(),
                actual: value.len(),
            });
        }
        region.write(slot, fingerprint, value, last_access_time);
        self.index.detach_slot(slot, fingerprint != EMPTY_FINGERPRINT);
        Ok(())
    }

    /// Read slot `slot` directly, bypassing the index.
    ///
    /// # Panics
    /// If the store is closed or `slot >= size()`.
    pub fn read(&self, slot: usize) -> SlotRecord {
        self.region_ref().read(slot)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Bytes per slot: `value_size() + 12`
    pub fn item_size(&self) -> usize {
        self.value_size() + SLOT_OVERHEAD
    }

    pub fn value_size(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.value_size())
    }

    /// Capacity in entries
    pub fn size(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.capacity())
    }

    /// Number of indexed entries. Raw writes are not counted until reopen.
    pub fn used_size(&self) -> usize {
        self.index.len()
    }

    pub fn seed(&self) -> u32 {
        self.region.as_ref().map_or(0, |r| r.header().seed)
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Panics unless the index is consistent with the mapped slots: recency
    /// order matches timestamps, map and list agree, capacity is respected.
    pub fn debug_validate_invariants(&self) {
        match &self.region {
            Some(region) => self.index.debug_validate_invariants(region),
            None => assert!(self.index.is_empty()),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Timestamp for the next mutation: never earlier than the current front
    /// entry, so moving to the front keeps the list sorted.
    fn now(&self) -> u32 {
        let clock_now = self.clock.now();
        match (&self.region, self.index.front()) {
            (Some(region), Some(front)) => clock_now.max(region.timestamp(front)),
            _ => clock_now,
        }
    }

    fn check_value(&self, value: &[u8]) -> Result<()> {
        let region = self.region.as_ref().ok_or(LruError::Closed)?;
        if value.len() > region.value_size() {
            return Err(LruError::ValueTooLarge {
                value_size: region.value_size(),
                actual: value.len(),
            });
        }
        Ok(())
    }

    fn region_ref(&self) -> &MappedRegion {
        self.region.as_ref().expect("store is not open")
    }

}

impl Drop for LruStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to flush store on drop");
        }
    }
}

impl std::fmt::Debug for LruStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruStore")
            .field("filename", &self.filename)
            .field("size", &self.size())
            .field("value_size", &self.value_size())
            .field("used_size", &self.used_size())
            .field("seed", &self.seed())
            .finish()
    }
}
