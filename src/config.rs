//! Configuration for dedupstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{DedupError, Result};

/// Main configuration for a dedupstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all records
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {store_name}.catalog   (catalog record)
    ///     └── {container_id}.blob    (one record per container)
    pub data_dir: PathBuf,

    /// Name of the catalog record to reopen. `None` starts a fresh store
    /// under a generated name.
    pub store_name: Option<String>,

    /// Sync strategy: whether every record write is fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Max payload bytes per block; longer payloads are truncated
    pub block_capacity: usize,

    /// Max distinct blocks per container
    pub container_capacity: usize,
}

/// Record sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every record write (safest, slowest)
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./dedupstore_data"),
            store_name: None,
            sync_strategy: SyncStrategy::EveryWrite,
            block_capacity: 8,
            container_capacity: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject layouts that could never hold data
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(DedupError::Config(
                "block_capacity must be at least 1 byte".to_string(),
            ));
        }
        if self.container_capacity == 0 {
            return Err(DedupError::Config(
                "container_capacity must be at least 1 block".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all records)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the catalog record to reopen
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.config.store_name = Some(name.into());
        self
    }

    /// Set the record sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the block capacity (in bytes)
    pub fn block_capacity(mut self, bytes: usize) -> Self {
        self.config.block_capacity = bytes;
        self
    }

    /// Set the container capacity (in blocks)
    pub fn container_capacity(mut self, blocks: usize) -> Self {
        self.config.container_capacity = blocks;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
