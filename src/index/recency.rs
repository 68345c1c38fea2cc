//! Fingerprint map plus recency list over a `MappedRegion`.
//!
//! The index never touches raw bytes itself: every read and write goes
//! through the region's slot accessors. Callers supply "now"; it must be at
//! least the front entry's timestamp or the ordering invariant breaks (the
//! store guarantees this, see `LruStore::now`).
//!
//! Slots filled by raw positional writes are withheld: they are neither
//! linked nor handed out by allocation until the next rebuild picks them up.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::fingerprint::EMPTY_FINGERPRINT;
use crate::storage::MappedRegion;

use super::list::{RecencyIter, RecencyList};

/// What `RecencyIndex::insert` did to make room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The fingerprint was already present; its slot was rewritten
    Updated { slot: usize },
    /// A free or never-used slot was taken
    Allocated { slot: usize },
    /// The least recently used entry was evicted and its slot reused
    Evicted { slot: usize, fingerprint: u64 },
}

impl Insertion {
    pub fn slot(&self) -> usize {
        match *self {
            Insertion::Updated { slot }
            | Insertion::Allocated { slot }
            | Insertion::Evicted { slot, .. } => slot,
        }
    }
}

#[derive(Debug)]
pub struct RecencyIndex {
    /// fingerprint → slot
    map: HashMap<u64, usize>,
    /// occupied slots, MRU first
    list: RecencyList,
    /// slots released by deletion, reused before `cursor` advances
    free: Vec<usize>,
    /// first slot that has never been handed out
    cursor: usize,
    /// fingerprint owned by each linked slot
    slot_fp: Vec<u64>,
    /// slots holding raw writes the index does not track
    withheld: Vec<bool>,
    withheld_count: usize,
}

impl RecencyIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            list: RecencyList::with_capacity(capacity),
            free: Vec::new(),
            cursor: 0,
            slot_fp: vec![EMPTY_FINGERPRINT; capacity],
            withheld: vec![false; capacity],
            withheld_count: 0,
        }
    }

    /// Rebuild the index by scanning every slot of `region`.
    ///
    /// Slot order on disk carries no meaning, so occupied slots are stably
    /// sorted by timestamp (newest first) before linking. If the same
    /// fingerprint appears in several slots the newest copy is kept and the
    /// others are emptied.
    pub fn rebuild(region: &mut MappedRegion) -> Self {
        let capacity = region.capacity();
        let mut index = Self::with_capacity(capacity);

        let mut occupied: Vec<(u32, usize)> = (0..capacity)
            .filter(|&slot| !region.is_empty_slot(slot))
            .map(|slot| (region.timestamp(slot), slot))
            .collect();
        occupied.sort_by(|a, b| b.0.cmp(&a.0));

        let mut duplicates = 0usize;
        for (_, slot) in occupied {
            let fingerprint = region.fingerprint(slot);
            if index.map.contains_key(&fingerprint) {
                region.clear_slot(slot);
                duplicates += 1;
                continue;
            }
            index.map.insert(fingerprint, slot);
            index.list.push_back(slot);
            index.slot_fp[slot] = fingerprint;
        }

        if duplicates > 0 {
            warn!(duplicates, "dropped duplicate fingerprints while rebuilding index");
        }

        index.cursor = (0..capacity)
            .rev()
            .find(|&slot| !region.is_empty_slot(slot))
            .map_or(0, |slot| slot + 1);
        // Reversed so that `pop` hands out the lowest index first
        index.free = (0..index.cursor)
            .rev()
            .filter(|&slot| region.is_empty_slot(slot))
            .collect();

        index
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.list.capacity()
    }

    pub fn slot_of(&self, fingerprint: u64) -> Option<usize> {
        self.map.get(&fingerprint).copied()
    }

    /// Whether `slot` holds an indexed entry
    pub fn is_linked(&self, slot: usize) -> bool {
        self.list.contains(slot)
    }

    /// Number of slots holding untracked raw writes
    pub fn withheld(&self) -> usize {
        self.withheld_count
    }

    pub fn front(&self) -> Option<usize> {
        self.list.front()
    }

    pub fn back(&self) -> Option<usize> {
        self.list.back()
    }

    /// Occupied slots, MRU to LRU
    pub fn iter(&self) -> RecencyIter<'_> {
        self.list.iter()
    }

    /// Insert or overwrite `fingerprint` and move it to the front.
    ///
    /// When every slot is taken the least recently used entry is evicted. If
    /// nothing is linked, a withheld raw slot is reclaimed instead. Returns
    /// `None` only if the index has no slots at all.
    pub fn insert(
        &mut self,
        region: &mut MappedRegion,
        fingerprint: u64,
        value: &[u8],
        now: u32,
    ) -> Option<Insertion> {
        if let Some(slot) = self.slot_of(fingerprint) {
            region.write(slot, fingerprint, value, now);
            self.list.move_to_front(slot);
            return Some(Insertion::Updated { slot });
        }

        let insertion = match self.allocate() {
            Some(slot) => Insertion::Allocated { slot },
            None => match self.list.pop_back() {
                Some(slot) => {
                    let evicted = std::mem::replace(&mut self.slot_fp[slot], EMPTY_FINGERPRINT);
                    self.map.remove(&evicted);
                    debug!(slot, fingerprint = evicted, "evicted least recently used entry");
                    Insertion::Evicted {
                        slot,
                        fingerprint: evicted,
                    }
                }
                None => {
                    let slot = self.reclaim_withheld()?;
                    let evicted = region.fingerprint(slot);
                    debug!(slot, fingerprint = evicted, "reclaimed slot holding a raw write");
                    Insertion::Evicted {
                        slot,
                        fingerprint: evicted,
                    }
                }
            },
        };

        let slot = insertion.slot();
        region.write(slot, fingerprint, value, now);
        self.map.insert(fingerprint, slot);
        self.list.push_front(slot);
        self.slot_fp[slot] = fingerprint;
        Some(insertion)
    }

    /// Refresh the timestamp of `fingerprint` and move it to the front
    pub fn touch(&mut self, region: &mut MappedRegion, fingerprint: u64, now: u32) -> bool {
        match self.slot_of(fingerprint) {
            Some(slot) => {
                region.set_timestamp(slot, now);
                self.list.move_to_front(slot);
                true
            }
            None => false,
        }
    }

    /// Remove `fingerprint`, emptying its slot and queueing it for reuse
    pub fn remove(&mut self, region: &mut MappedRegion, fingerprint: u64) -> bool {
        match self.map.remove(&fingerprint) {
            Some(slot) => {
                self.release(region, slot);
                true
            }
            None => false,
        }
    }

    /// Remove every entry with timestamp `< threshold`.
    ///
    /// Such entries form a suffix of the list, so the scan walks from the
    /// back and stops at the first entry that is new enough.
    pub fn remove_before(&mut self, region: &mut MappedRegion, threshold: u32) -> usize {
        let mut removed = 0;
        while let Some(slot) = self.list.back() {
            if region.timestamp(slot) >= threshold {
                break;
            }
            let fingerprint = self.slot_fp[slot];
            self.map.remove(&fingerprint);
            self.release(region, slot);
            removed += 1;
        }
        removed
    }

    /// Hand `slot` over to a raw positional write.
    ///
    /// Any entry linked at `slot` is dropped. If the write leaves data behind
    /// the slot is withheld from allocation, otherwise it becomes free.
    pub fn detach_slot(&mut self, slot: usize, holds_data: bool) {
        if self.list.contains(slot) {
            let fingerprint = std::mem::replace(&mut self.slot_fp[slot], EMPTY_FINGERPRINT);
            self.map.remove(&fingerprint);
            self.list.remove(slot);
            debug!(slot, fingerprint, "raw write replaced indexed entry");
        }
        self.free.retain(|&free| free != slot);
        if self.withheld[slot] {
            self.withheld[slot] = false;
            self.withheld_count -= 1;
        }

        if holds_data {
            self.withheld[slot] = true;
            self.withheld_count += 1;
        } else if slot < self.cursor {
            self.free.push(slot);
        }
    }

    /// Forget every entry. The region is not touched.
    pub fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
        self.free.clear();
        self.cursor = 0;
        self.slot_fp.fill(EMPTY_FINGERPRINT);
        self.withheld.fill(false);
        self.withheld_count = 0;
    }

    /// Panics unless the index and `region` agree and all invariants hold.
    pub fn debug_validate_invariants(&self, region: &MappedRegion) {
        self.list.debug_validate_invariants();

        assert_eq!(self.map.len(), self.list.len(), "map/list size mismatch");
        assert!(
            self.map.len() + self.withheld_count <= region.capacity(),
            "more entries than capacity"
        );
        assert!(self.cursor <= region.capacity());

        let mut previous: Option<u32> = None;
        for slot in self.list.iter() {
            let fingerprint = region.fingerprint(slot);
            assert_eq!(self.slot_fp[slot], fingerprint, "slot {} fingerprint drifted", slot);
            assert_eq!(self.map.get(&fingerprint), Some(&slot), "slot {} not indexed", slot);
            assert!(!self.withheld[slot], "linked slot {} is withheld", slot);

            let timestamp = region.timestamp(slot);
            if let Some(prev) = previous {
                assert!(
                    prev >= timestamp,
                    "recency order broken at slot {}: {} after {}",
                    slot,
                    timestamp,
                    prev
                );
            }
            previous = Some(timestamp);
        }

        for &slot in &self.free {
            assert!(slot < self.cursor, "free slot {} beyond cursor", slot);
            assert!(!self.list.contains(slot), "free slot {} is linked", slot);
            assert!(region.is_empty_slot(slot), "free slot {} holds data", slot);
            assert!(!self.withheld[slot], "free slot {} is withheld", slot);
        }

        let withheld: Vec<usize> = (0..region.capacity()).filter(|&s| self.withheld[s]).collect();
        assert_eq!(withheld.len(), self.withheld_count, "withheld count drifted");
        for &slot in &withheld {
            assert!(!region.is_empty_slot(slot), "withheld slot {} is empty", slot);
        }

        let occupied = (0..region.capacity())
            .filter(|&slot| !region.is_empty_slot(slot))
            .count();
        assert_eq!(
            occupied,
            self.map.len() + self.withheld_count,
            "untracked data in region"
        );
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn allocate(&mut self) -> Option<usize> {
        if let Some(slot) = self.free.pop() {
            return Some(slot);
        }
        while self.cursor < self.capacity() {
            let slot = self.cursor;
            self.cursor += 1;
            if !self.withheld[slot] {
                return Some(slot);
            }
        }
        None
    }

    fn reclaim_withheld(&mut self) -> Option<usize> {
        let slot = self.withheld.iter().position(|&w| w)?;
        self.withheld[slot] = false;
        self.withheld_count -= 1;
        Some(slot)
    }

    fn release(&mut self, region: &mut MappedRegion, slot: usize) {
        self.list.remove(slot);
        region.clear_slot(slot);
        self.slot_fp[slot] = EMPTY_FINGERPRINT;
        self.free.push(slot);
    }
}
