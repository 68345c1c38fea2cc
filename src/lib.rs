//! # lrustore
//!
//! A persistent, fixed-capacity key → value cache with LRU eviction:
//! - The whole state is one flat file, memory-mapped while open
//! - Keys are reduced to seeded 64-bit fingerprints
//! - Fixed-size values, fixed slot count, chosen at creation
//! - Age-based eviction and cross-file merge
//! - A damaged file is recreated empty instead of failing the caller
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  LruStore (lifecycle / API)                 │
//! │     open · open_or_create · insert · touch · merge · ...    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Recency Index                           │
//! │   fingerprint → slot map   +   slot-linked recency list     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ slot indices only
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Mapped Region                            │
//! │        header (12 B) | slot 0 | slot 1 | ... | slot N-1     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lrustore::LruStore;
//!
//! let mut store = LruStore::create_with_params("/tmp/history.db", 4, 1000, 0x5eed)?;
//! store.insert("apple", b"0001")?;
//! assert_eq!(store.lookup("apple"), Some(&b"0001"[..]));
//! store.delete_elements_untouched_for_62_days()?;
//! # Ok::<(), lrustore::LruError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;
pub mod fingerprint;

pub mod storage;
pub mod index;
pub mod store;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LruError, Result};
pub use config::StoreConfig;
pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::fingerprint;
pub use storage::SlotRecord;
pub use store::LruStore;
pub use shared::SharedStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lrustore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
