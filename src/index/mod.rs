//! Recency Index Module
//!
//! In-memory index over the mapped slots, rebuilt from the file on every open.
//!
//! ## Responsibilities
//! - Map key fingerprints to slot indices
//! - Keep occupied slots in recency order (front = most recently used)
//! - Allocate slots: freed slots first, then untouched slots, then LRU eviction
//!
//! ## Invariants
//! - List order is non-increasing by stored timestamp, front to back
//! - Every fingerprint in the map has exactly one list node and vice versa
//! - The number of entries never exceeds the file's capacity

mod list;
mod recency;

pub use list::{RecencyIter, RecencyList};
pub use recency::{Insertion, RecencyIndex};
