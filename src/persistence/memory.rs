//! In-memory record store
//!
//! Useful for tests and throwaway stores.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::Result;

use super::{validate_record_name, RecordStore};

/// Record store backed by a `RwLock<HashMap>`
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_record_name(name)?;
        Ok(self.records.read().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_record_name(name)?;
        self.records.write().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        validate_record_name(name)?;
        Ok(self.records.write().remove(name).is_some())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.records.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        validate_record_name(name)?;
        Ok(self.records.read().contains_key(name))
    }
}
