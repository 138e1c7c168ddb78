//! Catalog Module
//!
//! The top-level index of a store. Maps external keys to content hashes and
//! content hashes to the containers that hold them, and decides where new
//! blocks are placed.
//!
//! ## Responsibilities
//! - Bind keys to payloads, deduplicating identical (truncated) payloads
//! - First-fit placement of new blocks into containers with spare capacity
//! - Persist its own record after every state change
//! - Reload full state from a previously written record
//!
//! ## Concurrency Model: Single Writer
//!
//! Mutations take `&mut self` and run synchronously to completion, ending
//! with a durable write. Nothing coordinates separate processes: two
//! writers on one data directory will race on the catalog and container
//! records and can corrupt the index.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::{Block, ContentHash};
use crate::config::Config;
use crate::container::{now_millis, Container, ContainerId};
use crate::error::{DedupError, Result};
use crate::persistence::{
    load_record, save_record, validate_record_name, FileRecordStore, RecordKind, RecordStore,
};

/// What `put_block` did with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutKind {
    /// A new block was created
    Stored,

    /// The key was attached to an existing block with the same hash
    Deduplicated,

    /// The key was already bound; nothing was written
    AlreadyBound,
}

/// Result of a successful `put_block`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub kind: PutKind,

    /// Hash the key is bound to
    pub content_hash: ContentHash,

    /// Container holding the block
    pub container: ContainerId,

    /// True if the payload was cut down to the block capacity.
    /// Always false for `AlreadyBound`, since nothing was stored.
    pub truncated: bool,
}

/// Point-in-time counts derived from the indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Bound external keys
    pub keys: usize,

    /// Distinct stored blocks
    pub units: usize,

    /// Containers holding at least one indexed block
    pub containers: usize,
}

/// Persisted catalog state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CatalogState {
    block_capacity: usize,
    container_capacity: usize,

    /// key → content_hash
    key_index: BTreeMap<String, ContentHash>,

    /// content_hash → container
    container_index: BTreeMap<ContentHash, ContainerId>,
}

/// The deduplication catalog
#[derive(Debug)]
pub struct Catalog<S: RecordStore = FileRecordStore> {
    /// Where catalog and container records live
    store: S,

    /// Names the catalog record
    store_name: String,

    state: CatalogState,
}

impl Catalog<FileRecordStore> {
    /// Open a file-backed catalog described by `config`
    ///
    /// A named store must already exist; without a name a new one is created.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store = FileRecordStore::open(&config.data_dir, config.sync_strategy)?;
        Self::open_with_store(
            store,
            config.store_name.as_deref(),
            config.block_capacity,
            config.container_capacity,
        )
    }
}

impl<S: RecordStore> Catalog<S> {
    // =========================================================================
    // Record Naming
    // =========================================================================

    const RECORD_SUFFIX: &'static str = ".catalog";
    const GENERATED_PREFIX: &'static str = "catalog-";

    /// Name of the durable record for a catalog called `store_name`
    pub fn record_name(store_name: &str) -> String {
        format!("{}{}", store_name, Self::RECORD_SUFFIX)
    }

    // =========================================================================
    // Open / Load
    // =========================================================================

    /// Open a catalog on an arbitrary record store
    ///
    /// - `Some(name)`: the existing record is reloaded, and the persisted
    ///   capacities take precedence over the ones passed in. A missing record
    ///   fails with `RecordNotFound` and nothing is written.
    /// - `None`: a fresh catalog is created under a generated name
    pub fn open_with_store(
        store: S,
        store_name: Option<&str>,
        block_capacity: usize,
        container_capacity: usize,
    ) -> Result<Self> {
        Self::validate_capacities(block_capacity, container_capacity)?;

        let Some(name) = store_name else {
            let name = Self::generate_store_name(&store)?;
            return Self::create_with_store(store, &name, block_capacity, container_capacity);
        };

        let catalog = Self::load(store, name)?;
        if catalog.block_capacity() != block_capacity
            || catalog.container_capacity() != container_capacity
        {
            warn!(
                store = name,
                block_capacity = catalog.block_capacity(),
                container_capacity = catalog.container_capacity(),
                "requested capacities differ from stored catalog, keeping stored"
            );
        }
        Ok(catalog)
    }

    /// Create an empty catalog under `store_name` and persist it
    ///
    /// Fails with `Config` if a catalog record with that name already exists.
    pub fn create_with_store(
        store: S,
        store_name: &str,
        block_capacity: usize,
        container_capacity: usize,
    ) -> Result<Self> {
        Self::validate_capacities(block_capacity, container_capacity)?;

        let record = Self::record_name(store_name);
        validate_record_name(&record)?;
        if store.exists(&record)? {
            return Err(DedupError::Config(format!(
                "store {:?} already exists",
                store_name
            )));
        }

        let catalog = Self {
            store,
            store_name: store_name.to_string(),
            state: CatalogState {
                block_capacity,
                container_capacity,
                key_index: BTreeMap::new(),
                container_index: BTreeMap::new(),
            },
        };
        catalog.save()?;

        info!(
            store = %catalog.store_name,
            block_capacity,
            container_capacity,
            "created catalog"
        );
        Ok(catalog)
    }

    fn validate_capacities(block_capacity: usize, container_capacity: usize) -> Result<()> {
        Config {
            block_capacity,
            container_capacity,
            ..Config::default()
        }
        .validate()
    }

    /// Reload a catalog from its record; `RecordNotFound` if it does not exist
    pub fn load(store: S, store_name: &str) -> Result<Self> {
        let record = Self::record_name(store_name);
        let state: CatalogState = load_record(&store, RecordKind::Catalog, &record)?;

        if let Some((key, hash)) = state
            .key_index
            .iter()
            .find(|(_, hash)| !state.container_index.contains_key(*hash))
        {
            return Err(DedupError::Corrupt(format!(
                "key {:?} bound to unplaced hash {}",
                key, hash
            )));
        }

        info!(
            store = store_name,
            keys = state.key_index.len(),
            units = state.container_index.len(),
            "loaded catalog"
        );

        Ok(Self {
            store,
            store_name: store_name.to_string(),
            state,
        })
    }

    /// `catalog-<unix seconds>`, suffixed if that record is already taken
    fn generate_store_name(store: &S) -> Result<String> {
        let base = format!("{}{}", Self::GENERATED_PREFIX, now_millis() / 1000);
        let mut name = base.clone();
        let mut attempt = 1;
        while store.exists(&Self::record_name(&name))? {
            name = format!("{}-{}", base, attempt);
            attempt += 1;
        }
        Ok(name)
    }

    /// Overwrite the catalog record with the current state
    pub fn save(&self) -> Result<()> {
        save_record(
            &self.store,
            RecordKind::Catalog,
            &Self::record_name(&self.store_name),
            &self.state,
        )
    }

    // =========================================================================
    // Put / Get
    // =========================================================================

    /// Hash of `data` as it would be stored (after truncation)
    pub fn content_hash(&self, data: &[u8]) -> ContentHash {
        ContentHash::of(Block::truncate(self.state.block_capacity, data))
    }

    /// Bind `key` to `data`
    ///
    /// Steps:
    /// 1. Already-bound keys are left untouched (first write wins)
    /// 2. Truncate and hash the payload
    /// 3. Known hash: attach the key to the existing block
    /// 4. New hash: place a new block via first-fit
    /// 5. Persist the catalog record
    pub fn put_block(&mut self, key: &str, data: &[u8]) -> Result<PutOutcome> {
        // Step 1: First write wins
        if let Some(hash) = self.state.key_index.get(key) {
            debug!(key, %hash, "key already bound, skipping put");
            return Ok(PutOutcome {
                kind: PutKind::AlreadyBound,
                content_hash: hash.clone(),
                container: self.container_of(hash)?,
                truncated: false,
            });
        }

        // Step 2: Truncate and hash
        let capacity = self.state.block_capacity;
        let truncated = Block::was_truncated(capacity, data);
        if truncated {
            warn!(key, len = data.len(), capacity, "payload truncated to block capacity");
        }
        let hash = self.content_hash(data);

        // Steps 3 & 4: Dedup or place
        let (kind, container_id) = match self.state.container_index.get(&hash).copied() {
            Some(id) => {
                let mut container = Container::load(&self.store, id)?;
                container
                    .add_reference(&self.store, &hash, key)
                    .map_err(|e| match e {
                        DedupError::BlockNotFound { container, hash } => {
                            let reason = format!(
                                "catalog places {} in container {} which lacks it",
                                hash, container
                            );
                            DedupError::Corrupt(reason)
                        }
                        other => other,
                    })?;

                debug!(key, %hash, container = %id, "deduplicated block");
                (PutKind::Deduplicated, id)
            }
            None => {
                let mut container = self.find_available_container()?;
                container.add_unit(&self.store, Block::new(capacity, key, data))?;
                self.state
                    .container_index
                    .insert(hash.clone(), container.id());

                debug!(key, %hash, container = %container.id(), "stored new block");
                (PutKind::Stored, container.id())
            }
        };

        // Step 5: Record the binding and persist
        self.state.key_index.insert(key.to_string(), hash.clone());
        self.save()?;

        Ok(PutOutcome {
            kind,
            content_hash: hash,
            container: container_id,
            truncated,
        })
    }

    /// Read the payload bound to `key`
    ///
    /// Always reloads the owning container from the record store.
    pub fn get_block(&self, key: &str) -> Result<Vec<u8>> {
        let hash = self
            .state
            .key_index
            .get(key)
            .ok_or_else(|| DedupError::KeyNotFound(key.to_string()))?;

        let container = Container::load(&self.store, self.container_of(hash)?)?;
        container
            .get_unit(hash)
            .map(|block| block.payload().to_vec())
            .ok_or_else(|| {
                DedupError::Corrupt(format!(
                    "container {} lacks block {} for key {:?}",
                    container.id(),
                    hash,
                    key
                ))
            })
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// First container with spare capacity, or a fresh one
    ///
    /// Scans distinct known containers in ascending id order, loading each
    /// from the record store. The returned container is unsaved if new.
    fn find_available_container(&self) -> Result<Container> {
        let ids = self.container_ids();

        for &id in &ids {
            let container = Container::load(&self.store, id)?;
            if !container.is_full() {
                debug!(container = %id, size = container.len(), "reusing container");
                return Ok(container);
            }
        }

        let mut id = ContainerId::generate(ids.last().copied());
        while self.store.exists(&id.record_name())? {
            id = id.next();
        }

        debug!(container = %id, "opening new container");
        Ok(Container::new(id, self.state.container_capacity))
    }

    fn container_of(&self, hash: &ContentHash) -> Result<ContainerId> {
        self.state
            .container_index
            .get(hash)
            .copied()
            .ok_or_else(|| DedupError::Corrupt(format!("hash {} has no container", hash)))
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn block_capacity(&self) -> usize {
        self.state.block_capacity
    }

    pub fn container_capacity(&self) -> usize {
        self.state.container_capacity
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.key_index.contains_key(key)
    }

    pub fn hash_for_key(&self, key: &str) -> Option<&ContentHash> {
        self.state.key_index.get(key)
    }

    pub fn container_for_hash(&self, hash: &ContentHash) -> Option<ContainerId> {
        self.state.container_index.get(hash).copied()
    }

    /// Bound keys, in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.state.key_index.keys().map(String::as_str)
    }

    /// Distinct containers referenced by the index, ascending
    pub fn container_ids(&self) -> Vec<ContainerId> {
        let ids: BTreeSet<ContainerId> = self.state.container_index.values().copied().collect();
        ids.into_iter().collect()
    }

    /// Load a container through this catalog's record store
    pub fn load_container(&self, id: ContainerId) -> Result<Container> {
        Container::load(&self.store, id)
    }

    /// Keys currently referencing the block stored under `hash`
    pub fn references(&self, hash: &ContentHash) -> Result<Vec<String>> {
        let id = self
            .container_for_hash(hash)
            .ok_or_else(|| DedupError::RecordNotFound(hash.to_string()))?;
        let container = Container::load(&self.store, id)?;
        let block = container
            .get_unit(hash)
            .ok_or_else(|| DedupError::BlockNotFound {
                container: id,
                hash: hash.clone(),
            })?;
        Ok(block.references().map(str::to_string).collect())
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            keys: self.state.key_index.len(),
            units: self.state.container_index.len(),
            containers: self.container_ids().len(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the record store (e.g. to reopen the catalog from it)
    pub fn into_store(self) -> S {
        self.store
    }
}
