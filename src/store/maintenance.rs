//! Maintenance operations
//!
//! Bulk operations over a whole store: listing, age-based deletion, reset,
//! and merging another store in. Each leaves the recency invariants intact.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{LruError, Result};
use crate::index::RecencyIndex;
use crate::storage::{MappedRegion, SlotRecord};

use super::LruStore;

/// 62 days, in seconds
pub const UNTOUCHED_LIMIT_SECS: u32 = 62 * 24 * 60 * 60;

impl LruStore {
    /// All values, most recently used first
    pub fn get_all_values(&self) -> Vec<Vec<u8>> {
        match &self.region {
            Some(region) => self
                .index
                .iter()
                .map(|slot| region.value(slot).to_vec())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Owned copies of all entries, most recently used first
    pub fn entries(&self) -> Vec<SlotRecord> {
        match &self.region {
            Some(region) => self.index.iter().map(|slot| region.read(slot)).collect(),
            None => Vec::new(),
        }
    }

    /// Delete every entry last accessed strictly before `threshold`.
    /// Returns the number of deleted entries.
    pub fn delete_elements_before(&mut self, threshold: u32) -> Result<usize> {
        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        let removed = self.index.remove_before(region, threshold);
        if removed > 0 {
            debug!(removed, threshold, "deleted stale entries");
        }
        Ok(removed)
    }

    /// Delete every entry not accessed in the last 62 days
    pub fn delete_elements_untouched_for_62_days(&mut self) -> Result<usize> {
        let threshold = self.clock.now().saturating_sub(UNTOUCHED_LIMIT_SECS);
        self.delete_elements_before(threshold)
    }

    /// Empty the store. Capacity, value size and seed are kept.
    pub fn clear(&mut self) -> Result<()> {
        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        region.zero_slots();
        self.index.clear();
        region.flush()?;
        info!(path = %self.filename.display(), "cleared store");
        Ok(())
    }

    /// Merge the store file at `path` into this one
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let other = LruStore::create(path)?;
        self.merge(&other)
    }

    /// Merge every entry of `other` into this store.
    ///
    /// Both sides contribute every occupied slot, including raw writes not yet
    /// indexed.
    /// For a fingerprint present in both, the later timestamp wins and a tie
    /// keeps this store's entry. Timestamps are carried over unchanged. If the
    /// union exceeds this store's capacity, the least recently used entries
    /// are dropped.
    pub fn merge(&mut self, other: &LruStore) -> Result<()> {
        let theirs = other.region.as_ref().ok_or(LruError::Closed)?;
        let ours = self.region.as_ref().ok_or(LruError::Closed)?;

        if ours.value_size() != theirs.value_size() {
            return Err(LruError::ValueSizeMismatch {
                ours: ours.value_size(),
                theirs: theirs.value_size(),
            });
        }
        if ours.header().seed != theirs.header().seed {
            warn!(
                ours = ours.header().seed,
                theirs = theirs.header().seed,
                "merging stores with different fingerprint seeds"
            );
        }

        // Ours first so a stable sort keeps ours on ties
        let mut entries = occupied_records(&self.index, ours);
        let incoming_records = occupied_records(&other.index, theirs);
        let incoming = incoming_records.len();
        entries.extend(incoming_records);
        entries.sort_by(|a, b| b.last_access_time.cmp(&a.last_access_time));

        let mut seen = HashSet::with_capacity(entries.len());
        entries.retain(|e| seen.insert(e.fingerprint));
        let unique = entries.len();
        entries.truncate(ours.capacity());

        let region = self.region.as_mut().ok_or(LruError::Closed)?;
        region.zero_slots();
        for (slot, entry) in entries.iter().enumerate() {
            region.write(slot, entry.fingerprint, &entry.value, entry.last_access_time);
        }
        self.index = RecencyIndex::rebuild(region);

        info!(
            incoming,
            used = self.index.len(),
            dropped = unique - entries.len(),
            "merged store"
        );
        Ok(())
    }
}

/// Every occupied slot: indexed entries MRU first, then untracked raw writes
fn occupied_records(index: &RecencyIndex, region: &MappedRegion) -> Vec<SlotRecord> {
    let mut records: Vec<SlotRecord> = index.iter().map(|slot| region.read(slot)).collect();
    records.extend(
        (0..region.capacity())
            .filter(|&slot| !index.is_linked(slot) && !region.is_empty_slot(slot))
            .map(|slot| region.read(slot)),
    );
    records
}
