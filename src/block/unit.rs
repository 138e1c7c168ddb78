//! Block implementation

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};

use super::ContentHash;

/// A capacity-bounded payload and the keys that reference it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Max payload length this block was created with
    capacity: usize,

    /// Stored bytes (already truncated to `capacity`)
    payload: Vec<u8>,

    /// SHA-1 of `payload`
    content_hash: ContentHash,

    /// External keys pointing at this block
    referencing_keys: BTreeSet<String>,
}

impl Block {
    /// Create a block for `data`, truncated to `capacity` bytes, with `key`
    /// as its only reference.
    ///
    /// Truncation is silent here; use [`Block::was_truncated`] to detect it.
    pub fn new(capacity: usize, key: impl Into<String>, data: &[u8]) -> Self {
        let payload = Self::truncate(capacity, data).to_vec();
        let content_hash = ContentHash::of(&payload);

        let mut referencing_keys = BTreeSet::new();
        referencing_keys.insert(key.into());

        Self {
            capacity,
            payload,
            content_hash,
            referencing_keys,
        }
    }

    /// The prefix of `data` a block of `capacity` would store
    pub fn truncate(capacity: usize, data: &[u8]) -> &[u8] {
        &data[..data.len().min(capacity)]
    }

    /// Whether storing `data` in a block of `capacity` loses bytes
    pub fn was_truncated(capacity: usize, data: &[u8]) -> bool {
        data.len() > capacity
    }

    /// Add a referencing key. Returns `false` if it was already present.
    pub fn add_reference(&mut self, key: impl Into<String>) -> bool {
        self.referencing_keys.insert(key.into())
    }

    /// Remove a referencing key
    ///
    /// The block is kept even when its last reference goes away.
    pub fn remove_reference(&mut self, key: &str) -> Result<()> {
        if self.referencing_keys.remove(key) {
            Ok(())
        } else {
            Err(DedupError::ReferenceNotFound {
                hash: self.content_hash.clone(),
                key: key.to_string(),
            })
        }
    }

    pub fn contains_reference(&self, key: &str) -> bool {
        self.referencing_keys.contains(key)
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.referencing_keys.iter().map(String::as_str)
    }

    pub fn reference_count(&self) -> usize {
        self.referencing_keys.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recompute the digest and compare it to the stored hash
    pub fn verify(&self) -> bool {
        ContentHash::of(&self.payload) == self.content_hash
    }
}
