//! Record codec
//!
//! Frames bincode payloads with a fixed header and CRC32 checksum.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DedupError, Result};

// =============================================================================
// Format Constants
// =============================================================================

/// Magic bytes identifying a dedupstore record
pub const MAGIC: &[u8; 4] = b"DDUP";

/// Current record format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Kind (1) + PayloadLen (4) + CRC32 (4)
pub const HEADER_SIZE: usize = 15;

/// What a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Catalog = 0x01,
    Container = 0x02,
}

impl RecordKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(RecordKind::Catalog),
            0x02 => Some(RecordKind::Container),
            _ => None,
        }
    }
}

// =============================================================================
// Encoding/Decoding
// =============================================================================

/// Encode a value as a framed record
pub fn encode_record<T: Serialize>(kind: RecordKind, value: &T) -> Result<Vec<u8>> {
    let payload =
        bincode::serialize(value).map_err(|e| DedupError::Serialization(e.to_string()))?;

    let payload_len = u32::try_from(payload.len()).map_err(|_| {
        DedupError::Serialization(format!("record payload too large: {} bytes", payload.len()))
    })?;

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(MAGIC);
    record.extend_from_slice(&VERSION.to_le_bytes());
    record.push(kind as u8);
    record.extend_from_slice(&payload_len.to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&payload);

    Ok(record)
}

/// Decode a framed record, validating header and checksum
pub fn decode_record<T: DeserializeOwned>(kind: RecordKind, bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(DedupError::Corrupt(format!(
            "record too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(DedupError::Corrupt(format!(
            "invalid magic: expected DDUP, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(DedupError::Corrupt(format!(
            "unsupported record version: {}",
            version
        )));
    }

    match RecordKind::from_u8(bytes[6]) {
        Some(found) if found == kind => {}
        Some(found) => {
            return Err(DedupError::Corrupt(format!(
                "expected {:?} record, found {:?}",
                kind, found
            )))
        }
        None => {
            return Err(DedupError::Corrupt(format!(
                "unknown record kind: {:#04x}",
                bytes[6]
            )))
        }
    }

    let payload_len = read_u32(bytes, 7) as usize;
    let expected_crc = read_u32(bytes, 11);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != payload_len {
        return Err(DedupError::Corrupt(format!(
            "payload length mismatch: header says {}, found {}",
            payload_len,
            payload.len()
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(DedupError::Corrupt(format!(
            "checksum mismatch: expected {:#010x}, got {:#010x}",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(payload).map_err(|e| DedupError::Corrupt(e.to_string()))
}

/// Little-endian u32 at `at`; caller has checked the bounds
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
