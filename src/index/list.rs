//! Arena-backed doubly linked recency list.
//!
//! Nodes live in a `Vec` indexed by slot number and link to each other by
//! index, so a slot index is its own list handle. Every slot has exactly one
//! node; `linked` says whether that node is currently in the list.
//!
//! ```text
//!   links (Vec<Link>, one per slot)
//!   ┌──────┬───────────────────────────────────────┐
//!   │ slot │ Link { prev, next, linked }           │
//!   ├──────┼───────────────────────────────────────┤
//!   │  0   │ { prev: Some(2), next: None, true }   │
//!   │  1   │ { prev: None, next: None, false }     │
//!   │  2   │ { prev: None, next: Some(0), true }   │
//!   └──────┴───────────────────────────────────────┘
//!
//!   head (MRU) ─► [2] ◄──► [0] ◄── tail (LRU)
//! ```
//!
//! All operations except `iter` and `clear` are O(1).

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

#[derive(Debug)]
pub struct RecencyList {
    links: Vec<Link>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RecencyList {
    /// Creates an empty list able to hold slots `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: vec![Link::default(); capacity],
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.links.get(slot).is_some_and(|l| l.linked)
    }

    /// Most recently used slot.
    pub fn front(&self) -> Option<usize> {
        self.head
    }

    /// Least recently used slot.
    pub fn back(&self) -> Option<usize> {
        self.tail
    }

    /// Links `slot` at the front. Returns `false` if it is already linked.
    pub fn push_front(&mut self, slot: usize) -> bool {
        if self.contains(slot) {
            return false;
        }
        self.attach_front(slot);
        true
    }

    /// Links `slot` at the back. Returns `false` if it is already linked.
    pub fn push_back(&mut self, slot: usize) -> bool {
        if self.contains(slot) {
            return false;
        }
        self.attach_back(slot);
        true
    }

    /// Unlinks `slot`. Returns `false` if it was not linked.
    pub fn remove(&mut self, slot: usize) -> bool {
        if !self.contains(slot) {
            return false;
        }
        self.detach(slot);
        true
    }

    pub fn pop_back(&mut self) -> Option<usize> {
        let slot = self.tail?;
        self.detach(slot);
        Some(slot)
    }

    pub fn move_to_front(&mut self, slot: usize) -> bool {
        if !self.contains(slot) {
            return false;
        }
        if self.head != Some(slot) {
            self.detach(slot);
            self.attach_front(slot);
        }
        true
    }

    pub fn clear(&mut self) {
        self.links.fill(Link::default());
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates slots front (MRU) to back (LRU).
    pub fn iter(&self) -> RecencyIter<'_> {
        RecencyIter {
            list: self,
            current: self.head,
        }
    }

    fn detach(&mut self, slot: usize) {
        let Link { prev, next, .. } = self.links[slot];

        match prev {
            Some(p) => self.links[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n].prev = prev,
            None => self.tail = prev,
        }

        self.links[slot] = Link::default();
        self.len -= 1;
    }

    fn attach_front(&mut self, slot: usize) {
        let old_head = self.head;
        self.links[slot] = Link {
            prev: None,
            next: old_head,
            linked: true,
        };
        match old_head {
            Some(h) => self.links[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
    }

    fn attach_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        self.links[slot] = Link {
            prev: old_tail,
            next: None,
            linked: true,
        };
        match old_tail {
            Some(t) => self.links[t].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    /// Panics if the links are inconsistent.
    pub fn debug_validate_invariants(&self) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(slot) = current {
            let link = self.links[slot];
            assert!(link.linked, "slot {} reachable but not linked", slot);
            assert_eq!(link.prev, prev);
            if link.next.is_none() {
                assert_eq!(self.tail, Some(slot));
            }
            prev = Some(slot);
            current = link.next;
            count += 1;
            assert!(count <= self.len, "cycle in recency list");
        }

        assert_eq!(count, self.len);
        assert_eq!(self.links.iter().filter(|l| l.linked).count(), self.len);
    }
}

pub struct RecencyIter<'a> {
    list: &'a RecencyList,
    current: Option<usize>,
}

impl Iterator for RecencyIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.current?;
        self.current = self.list.links[slot].next;
        Some(slot)
    }
}
