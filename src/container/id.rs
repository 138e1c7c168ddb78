//! Container identities
//!
//! ```text
//! ┌───────────────────────────────────────────┬────────────────────┐
//! │ millis since ID_EPOCH_MS (high 42 bits)   │ sequence (22 bits) │
//! └───────────────────────────────────────────┴────────────────────┘
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Offset subtracted from the wall clock before shifting
pub const ID_EPOCH_MS: u64 = 514_941_780;

/// Low bits reserved for containers created within the same millisecond
const SEQUENCE_BITS: u32 = 22;

/// Stable, time-derived container identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Generate an id from the current time, strictly greater than `after`
    pub fn generate(after: Option<ContainerId>) -> Self {
        let base = now_millis().saturating_sub(ID_EPOCH_MS) << SEQUENCE_BITS;
        match after {
            Some(last) if last.0 >= base => Self(last.0 + 1),
            _ => Self(base),
        }
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Unix millis at which this id was generated
    pub fn created_millis(&self) -> u64 {
        (self.0 >> SEQUENCE_BITS) + ID_EPOCH_MS
    }

    /// Name of the durable record holding this container
    pub fn record_name(&self) -> String {
        format!("{}.blob", self.0)
    }

    /// The id following this one, used when a generated id is already taken
    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current wall clock in unix milliseconds
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
