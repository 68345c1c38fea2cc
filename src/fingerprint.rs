//! Key fingerprinting
//!
//! Keys are never stored. Each key is reduced to a 64-bit seeded hash and
//! the hash is the identity of the entry.
//!
//! Two distinct keys that hash to the same fingerprint are indistinguishable:
//! writing one overwrites the other. With 64-bit fingerprints and tables of a
//! few thousand entries the probability is negligible, and the store accepts
//! it rather than paying for key storage.

use xxhash_rust::xxh64::xxh64;

/// Fingerprint value marking an empty slot
pub const EMPTY_FINGERPRINT: u64 = 0;

/// Compute the fingerprint of `key` under `seed`.
///
/// Never returns `EMPTY_FINGERPRINT`.
pub fn fingerprint(key: &str, seed: u32) -> u64 {
    match xxh64(key.as_bytes(), u64::from(seed)) {
        EMPTY_FINGERPRINT => 1,
        fp => fp,
    }
}
