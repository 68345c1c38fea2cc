//! Storage Module
//!
//! The on-disk half of the store: a single flat file mapped into memory.
//!
//! ## Responsibilities
//! - Define the fixed record layout and header
//! - Create freshly formatted, empty store files
//! - Validate an existing file before it is mapped
//! - Positional slot reads/writes over the mapping (no index side effects)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Header (12 bytes)                                │
//! │ ┌──────────────┬──────────────┬───────────────┐  │
//! │ │ValueSize (4) │Capacity (4)  │ Seed (4)      │  │
//! │ └──────────────┴──────────────┴───────────────┘  │
//! ├──────────────────────────────────────────────────┤
//! │ Slot 0                                           │
//! │ ┌──────────────────┬───────────┬──────────────┐  │
//! │ │ Fingerprint (8)  │ Atime (4) │ Value (N)    │  │
//! │ └──────────────────┴───────────┴──────────────┘  │
//! │ ... (Capacity slots, fingerprint 0 = empty)      │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian.

mod layout;
mod region;

pub use layout::{create_storage_file, FileHeader, HEADER_SIZE, SLOT_OVERHEAD};
pub use region::{MappedRegion, SlotRecord};
