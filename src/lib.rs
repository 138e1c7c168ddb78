//! # dedupstore
//!
//! A content-addressed deduplication store with:
//! - Capacity-bounded blocks addressed by SHA-1 content hash
//! - Bounded containers that pack blocks into durable records
//! - A catalog mapping external keys → hashes → containers
//! - Full-state snapshots after every mutation, reloadable on restart
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Catalog                              │
//! │        key_index: key → hash    container_index: hash → id   │
//! │                 (first-fit placement)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Container  │   ...    │  Container  │
//!   │ hash→Block  │          │ hash→Block  │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 RecordStore (file / memory)                  │
//! │       {store}.catalog          {container_id}.blob           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single process, single writer. See [`catalog`] for the concurrency notes.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod container;
pub mod persistence;
pub mod catalog;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DedupError, Result};
pub use config::{Config, SyncStrategy};
pub use block::{Block, ContentHash};
pub use container::{Container, ContainerId};
pub use persistence::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use catalog::{Catalog, CatalogStats, PutKind, PutOutcome};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dedupstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
