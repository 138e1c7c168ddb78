//! Container Module
//!
//! A bounded collection of blocks, keyed by content hash. The container is
//! the unit of durable storage: each one lives in its own record and is
//! rewritten in full after every mutation.
//!
//! ## Responsibilities
//! - Enforce the block count limit (`unit_capacity`)
//! - Track creation/modification timestamps
//! - Save itself synchronously after each successful mutation
//!
//! ## Record Layout
//! ```text
//! {id}.blob
//!   ├── id, unit_capacity
//!   ├── units: content_hash → Block
//!   └── created_at, modified_at (unix millis)
//! ```

mod id;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Block, ContentHash};
use crate::error::{DedupError, Result};
use crate::persistence::{load_record, save_record, RecordKind, RecordStore};

pub use id::{ContainerId, ID_EPOCH_MS};
pub(crate) use id::now_millis;

/// A capacity-bounded set of blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Stable identity (also names the record)
    id: ContainerId,

    /// Max number of distinct blocks
    unit_capacity: usize,

    /// content_hash → block
    units: BTreeMap<ContentHash, Block>,

    /// Unix millis
    created_at: u64,

    /// Unix millis of the last mutation
    modified_at: u64,
}

impl Container {
    /// Create an empty, not yet persisted container
    pub fn new(id: ContainerId, unit_capacity: usize) -> Self {
        let now = now_millis();
        Self {
            id,
            unit_capacity,
            units: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Load a container from its record
    ///
    /// Fails with `RecordNotFound` if it was never saved, or `Corrupt` if the
    /// record does not describe a well-formed container with this id.
    pub fn load(store: &dyn RecordStore, id: ContainerId) -> Result<Self> {
        let container: Container = load_record(store, RecordKind::Container, &id.record_name())?;

        if container.id != id {
            return Err(DedupError::Corrupt(format!(
                "record {} holds container {}",
                id.record_name(),
                container.id
            )));
        }
        if container.units.len() > container.unit_capacity {
            return Err(DedupError::Corrupt(format!(
                "container {} holds {} blocks, capacity {}",
                id,
                container.units.len(),
                container.unit_capacity
            )));
        }
        if let Some((hash, _)) = container
            .units
            .iter()
            .find(|(hash, block)| block.content_hash() != *hash)
        {
            return Err(DedupError::Corrupt(format!(
                "container {} indexes block under wrong hash {}",
                id, hash
            )));
        }

        Ok(container)
    }

    /// Write the full container state, replacing the previous record
    pub fn save(&self, store: &dyn RecordStore) -> Result<()> {
        save_record(store, RecordKind::Container, &self.id.record_name(), self)
    }

    // =========================================================================
    // Mutations (each one saves before returning)
    // =========================================================================

    /// Insert a block
    ///
    /// Rejected with `CapacityExceeded` when the container is full. If a
    /// block with the same hash is already present its references are merged
    /// into the existing block.
    pub fn add_unit(&mut self, store: &dyn RecordStore, block: Block) -> Result<()> {
        if self.is_full() {
            return Err(DedupError::CapacityExceeded {
                container: self.id,
                capacity: self.unit_capacity,
            });
        }

        let hash = block.content_hash().clone();
        match self.units.entry(hash.clone()) {
            Entry::Occupied(mut existing) => {
                for key in block.references() {
                    existing.get_mut().add_reference(key);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(block);
            }
        }

        self.touch();
        self.save(store)?;

        debug!(container = %self.id, %hash, size = self.len(), "added block");
        Ok(())
    }

    /// Attach `key` to the block stored under `hash`
    ///
    /// Returns `false` (and writes nothing) if the key was already attached.
    pub fn add_reference(
        &mut self,
        store: &dyn RecordStore,
        hash: &ContentHash,
        key: &str,
    ) -> Result<bool> {
        let id = self.id;
        let block = self.units.get_mut(hash).ok_or_else(|| DedupError::BlockNotFound {
            container: id,
            hash: hash.clone(),
        })?;

        if !block.add_reference(key) {
            return Ok(false);
        }

        self.touch();
        self.save(store)?;
        Ok(true)
    }

    /// Detach `key` from the block stored under `hash`
    ///
    /// The block stays in place even if no references remain.
    pub fn remove_reference(
        &mut self,
        store: &dyn RecordStore,
        hash: &ContentHash,
        key: &str,
    ) -> Result<()> {
        let id = self.id;
        let block = self.units.get_mut(hash).ok_or_else(|| DedupError::BlockNotFound {
            container: id,
            hash: hash.clone(),
        })?;

        block.remove_reference(key)?;

        self.touch();
        self.save(store)
    }

    /// Remove the block stored under `hash`; absent hashes are a no-op
    pub fn remove_unit_by_hash(
        &mut self,
        store: &dyn RecordStore,
        hash: &ContentHash,
    ) -> Result<Option<Block>> {
        let removed = self.units.remove(hash);
        if removed.is_some() {
            self.touch();
            self.save(store)?;
            debug!(container = %self.id, %hash, "removed block");
        }
        Ok(removed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn unit_capacity(&self) -> usize {
        self.unit_capacity
    }

    /// Number of blocks currently held
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.units.len() >= self.unit_capacity
    }

    pub fn get_unit(&self, hash: &ContentHash) -> Option<&Block> {
        self.units.get(hash)
    }

    pub fn contains_unit(&self, hash: &ContentHash) -> bool {
        self.units.contains_key(hash)
    }

    /// Hashes of all blocks, in ascending order
    pub fn hashes(&self) -> impl Iterator<Item = &ContentHash> {
        self.units.keys()
    }

    pub fn units(&self) -> impl Iterator<Item = &Block> {
        self.units.values()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    fn touch(&mut self) {
        self.modified_at = now_millis().max(self.modified_at);
    }
}
