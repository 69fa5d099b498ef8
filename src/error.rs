//! Error types for burrowkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BurrowError
pub type Result<T> = std::result::Result<T, BurrowError>;

/// Unified error type for burrowkv operations
#[derive(Debug, Error)]
pub enum BurrowError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Outcomes
    // -------------------------------------------------------------------------
    /// Key is absent from every layer that was queried
    #[error("Key not found")]
    KeyNotFound,

    /// Key exists but its most recent version is a tombstone
    #[error("Key is deleted")]
    Deleted,

    /// Delete issued against a key that is already a tombstone
    #[error("Key is already deleted")]
    AlreadyDeleted,

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    /// SSTable failed its magic-number or checksum validation
    #[error("Corrupt SSTable: {0}")]
    Corrupt(String),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Iterator exhausted")]
    IteratorExhausted,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BurrowError {
    /// True for errors caused by damaged on-disk data
    pub fn is_corrupt(&self) -> bool {
        matches!(self, BurrowError::Corrupt(_) | BurrowError::WalCorruption(_))
    }

    /// True for the two "no value" outcomes a lookup can produce
    pub fn is_miss(&self) -> bool {
        matches!(self, BurrowError::KeyNotFound | BurrowError::Deleted)
    }
}
