//! Shared store handle
//!
//! `LruStore` has no internal locking. `SharedStore` is a cloneable handle
//! that serializes every call through one mutex, for callers that pass a
//! single store around several threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::store::LruStore;

#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<LruStore>>,
}

impl SharedStore {
    pub fn new(store: LruStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Exclusive access for multi-step operations
    pub fn lock(&self) -> MutexGuard<'_, LruStore> {
        self.inner.lock()
    }

    /// Owned copy of the value for `key`
    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().lookup(key).map(<[u8]>::to_vec)
    }

    pub fn insert(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.lock().insert(key, value)
    }

    pub fn try_insert(&self, key: &str, value: &[u8]) -> Result<bool> {
        self.inner.lock().try_insert(key, value)
    }

    pub fn touch(&self, key: &str) -> Result<bool> {
        self.inner.lock().touch(key)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.inner.lock().delete(key)
    }

    pub fn used_size(&self) -> usize {
        self.inner.lock().used_size()
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedStore").field(&*self.inner.lock()).finish()
    }
}
