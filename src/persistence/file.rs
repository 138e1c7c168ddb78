//! File-backed record store
//!
//! One file per record, directly under the root directory.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::SyncStrategy;
use crate::error::Result;

use super::{validate_record_name, RecordStore};

/// Stores each record as `{root}/{name}`
///
/// Writes truncate and rewrite the file in place.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
    sync_strategy: SyncStrategy,
}

impl FileRecordStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>, sync_strategy: SyncStrategy) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            sync_strategy,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path backing a record
    pub fn record_path(&self, name: &str) -> Result<PathBuf> {
        validate_record_name(name)?;
        Ok(self.root.join(name))
    }
}

impl RecordStore for FileRecordStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.record_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.record_path(name)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        file.write_all(bytes)?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            file.sync_all()?;
        }

        debug!(record = name, size = bytes.len(), "wrote record");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let path = self.record_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.record_path(name)?.is_file())
    }
}
