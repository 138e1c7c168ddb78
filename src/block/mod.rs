//! Block Module
//!
//! The smallest stored object: one distinct payload plus the external keys
//! that reference it.
//!
//! ## Responsibilities
//! - Bound payload size (truncate to the configured capacity)
//! - Derive the content hash used as the deduplication key
//! - Track which external keys share the payload
//!
//! ## Invariants
//! - `content_hash` is always SHA-1(payload), where payload is already truncated
//! - Payload never changes after creation; only the reference set does

mod hash;
mod unit;

pub use hash::ContentHash;
pub use unit::Block;
