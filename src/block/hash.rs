//! Content hashes
//!
//! 160-bit SHA-1 digests rendered as lowercase hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::DedupError;

/// Hex length of a SHA-1 digest (20 bytes → 40 chars)
const HEX_LEN: usize = 40;

/// Hex-encoded SHA-1 digest of a block payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash `data` exactly as given (callers truncate first)
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        Self(hex::encode(digest))
    }

    /// The hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower.len() != HEX_LEN || hex::decode(&lower).is_err() {
            return Err(DedupError::Corrupt(format!(
                "not a SHA-1 hex digest: {:?}",
                s
            )));
        }
        Ok(Self(lower))
    }
}
