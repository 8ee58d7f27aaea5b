//! Content hashing for chunks and checkpoints
//!
//! Hex SHA-256 digests. Chunk hashes cover every event's canonical JSON plus
//! the previous chunk's hash, which is what chains chunks together: altering
//! any sealed event changes that chunk's hash and breaks every later link.
//! serde_json serializes object keys in sorted order, so digests are stable
//! across runs. Tamper detection only; this is not a signature scheme.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::Event;

/// Hex-encoded SHA-256 of raw bytes.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Chunk digest over event content and the previous chunk's hash.
pub fn chunk_hash(events: &[Event], previous_hash: Option<&str>) -> Result<String> {
    let mut hasher = Sha256::new();
    for event in events {
        hasher.update(serde_json::to_string(event)?.as_bytes());
        hasher.update(b"\n");
    }
    if let Some(previous) = previous_hash {
        hasher.update(previous.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checkpoint digest over the snapshotted state and its sequence.
pub fn checkpoint_hash(state: &Value, sequence: u64) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_string(state)?.as_bytes());
    hasher.update(sequence.to_be_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
