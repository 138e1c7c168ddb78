//! Persistence Module
//!
//! Durable snapshots of container and catalog state, written to named records.
//!
//! ## Responsibilities
//! - Abstract "read named record" / "write named record" behind [`RecordStore`]
//! - Frame every record with magic, version, kind and a CRC32 checksum
//! - Detect corrupt records on load (no partial recovery is attempted)
//!
//! ## Record Format
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Header (15 bytes)                                             │
//! │ ┌──────────┬───────────┬─────────┬──────────────┬───────────┐ │
//! │ │Magic (4) │Version (2)│Kind (1) │PayloadLen (4)│ CRC32 (4) │ │
//! │ └──────────┴───────────┴─────────┴──────────────┴───────────┘ │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Payload (bincode)                                             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are rewritten in full on every save. There is no write-ahead log
//! and no atomic rename: an interrupted write can lose the previous version
//! of that record. Only one process may write a given data directory.

mod codec;
mod file;
mod memory;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DedupError, Result};

pub use codec::{decode_record, encode_record, RecordKind, HEADER_SIZE, MAGIC, VERSION};
pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

/// Storage backend for named durable records
///
/// Names are single path components (no separators, not `.` or `..`).
pub trait RecordStore: Send + Sync {
    /// Read a record. Returns `Ok(None)` if it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Create or overwrite a record
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Delete a record. Returns `Ok(false)` if it did not exist.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Names of all stored records
    fn list(&self) -> Result<Vec<String>>;

    /// Check whether a record exists
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.read(name)?.is_some())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(name, bytes)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        (**self).remove(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }

    fn exists(&self, name: &str) -> Result<bool> {
        (**self).exists(name)
    }
}

/// Load and decode a record, failing with `RecordNotFound` if it is missing
pub fn load_record<T: DeserializeOwned>(
    store: &dyn RecordStore,
    kind: RecordKind,
    name: &str,
) -> Result<T> {
    let bytes = store
        .read(name)?
        .ok_or_else(|| DedupError::RecordNotFound(name.to_string()))?;
    decode_record(kind, &bytes)
}

/// Encode and write a record, replacing any previous version
pub fn save_record<T: Serialize>(
    store: &dyn RecordStore,
    kind: RecordKind,
    name: &str,
    value: &T,
) -> Result<()> {
    let bytes = encode_record(kind, value)?;
    store.write(name, &bytes)
}

/// Reject names that would escape the store root or be ambiguous
pub(crate) fn validate_record_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DedupError::InvalidRecordName(name.to_string()));
    }
    Ok(())
}
