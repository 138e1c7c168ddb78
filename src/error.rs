//! Error types for dedupstore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::block::ContentHash;
use crate::container::ContainerId;

/// Result type alias using DedupError
pub type Result<T> = std::result::Result<T, DedupError>;

/// Unified error type for dedupstore operations
#[derive(Debug, Error)]
pub enum DedupError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Block {hash} not found in container {container}")]
    BlockNotFound {
        container: ContainerId,
        hash: ContentHash,
    },

    #[error("Key {key} does not reference block {hash}")]
    ReferenceNotFound { hash: ContentHash, key: String },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Container {container} is full ({capacity} blocks)")]
    CapacityExceeded {
        container: ContainerId,
        capacity: usize,
    },

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid record name: {0:?}")]
    InvalidRecordName(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DedupError {
    /// True for every "does not exist" flavour
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DedupError::KeyNotFound(_)
                | DedupError::RecordNotFound(_)
                | DedupError::BlockNotFound { .. }
                | DedupError::ReferenceNotFound { .. }
        )
    }
}
