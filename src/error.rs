//! Error types for lrustore
//!
//! Provides a unified error type for all store operations.
//!
//! A missing key is never an error: lookups return `Option` and
//! `touch`/`try_insert`/`delete` report misses through their `bool` result.

use thiserror::Error;

/// Result type alias using LruError
pub type Result<T> = std::result::Result<T, LruError>;

/// Unified error type for lrustore operations
#[derive(Debug, Error)]
pub enum LruError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // File Format Errors
    // -------------------------------------------------------------------------
    #[error("Invalid store file: {0}")]
    Format(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Value Errors
    // -------------------------------------------------------------------------
    #[error("Value of {actual} bytes exceeds value size {value_size}")]
    ValueTooLarge { value_size: usize, actual: usize },

    #[error("Cannot merge stores with value size {theirs} into value size {ours}")]
    ValueSizeMismatch { ours: usize, theirs: usize },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is not open")]
    Closed,

    #[error("No slot available for a new entry")]
    NoSlot,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for LruError {
    fn from(err: bincode::Error) -> Self {
        LruError::Serialization(err.to_string())
    }
}
