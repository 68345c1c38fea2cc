//! Configuration for lrustore
//!
//! The parameters a store file is created with. They are written into the
//! file header and never change for the life of the file.

use std::path::PathBuf;

use crate::error::{LruError, Result};

/// Parameters of a single store file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the backing file
    pub path: PathBuf,

    /// Bytes of payload stored per entry
    pub value_size: usize,

    /// Maximum number of entries (slot count)
    pub capacity: usize,

    /// Seed mixed into every key fingerprint
    pub seed: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./lrustore.db"),
            value_size: 4,
            capacity: 1024,
            seed: 0,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Check that the parameters can be represented in a store file
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(LruError::Config("capacity must be at least 1".to_string()));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(LruError::Config(format!(
                "capacity {} does not fit in 32 bits",
                self.capacity
            )));
        }
        if u32::try_from(self.value_size).is_err() {
            return Err(LruError::Config(format!(
                "value size {} does not fit in 32 bits",
                self.value_size
            )));
        }
        Ok(())
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the per-entry value size (in bytes)
    pub fn value_size(mut self, size: usize) -> Self {
        self.config.value_size = size;
        self
    }

    /// Set the maximum number of entries
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the fingerprint seed
    pub fn seed(mut self, seed: u32) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
