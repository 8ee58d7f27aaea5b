//! Hash chain verification
//!
//! A chain break is data, not an error: callers get a structured result
//! naming the first broken link so a campaign's history can be flagged and
//! manually reconciled. Verification never repairs anything.

use serde::{Deserialize, Serialize};

use super::hash::chunk_hash;
use crate::error::Result;
use crate::types::EventChunk;

/// Why a chain link failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakReason {
    /// Manifest references a chunk the storage no longer has
    MissingChunk,
    /// Recomputed content hash differs from the stored hash
    HashMismatch,
    /// `previousHash` does not equal the prior chunk's hash
    LinkBroken,
}

impl std::fmt::Display for BreakReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakReason::MissingChunk => write!(f, "missing_chunk"),
            BreakReason::HashMismatch => write!(f, "hash_mismatch"),
            BreakReason::LinkBroken => write!(f, "link_broken"),
        }
    }
}

/// First broken link in a campaign's chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Position in the manifest's chunk list
    pub index: usize,

    #[serde(rename = "chunkId")]
    pub chunk_id: String,

    pub reason: BreakReason,
}

/// Outcome of walking a campaign's chunk chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    #[serde(rename = "isValid")]
    pub is_valid: bool,

    /// Chunks the manifest lists, verified or not
    #[serde(rename = "chunkCount")]
    pub chunk_count: usize,

    #[serde(rename = "firstBreak", skip_serializing_if = "Option::is_none")]
    pub first_break: Option<ChainBreak>,
}

impl ChainVerification {
    pub fn valid(chunk_count: usize) -> Self {
        Self {
            is_valid: true,
            chunk_count,
            first_break: None,
        }
    }

    pub fn broken(chunk_count: usize, first_break: ChainBreak) -> Self {
        Self {
            is_valid: false,
            chunk_count,
            first_break: Some(first_break),
        }
    }
}

/// Walk pre-loaded chunks in manifest order, recomputing each hash and
/// confirming every `previousHash` link. `None` entries are chunks the
/// storage could not produce. Stops at the first break.
pub(crate) fn verify_chunk_list(
    entries: &[(String, Option<EventChunk>)],
) -> Result<ChainVerification> {
    let mut previous_hash: Option<&str> = None;

    for (index, (chunk_id, chunk)) in entries.iter().enumerate() {
        let Some(chunk) = chunk else {
            return Ok(ChainVerification::broken(
                entries.len(),
                ChainBreak {
                    index,
                    chunk_id: chunk_id.clone(),
                    reason: BreakReason::MissingChunk,
                },
            ));
        };

        let recomputed = chunk_hash(&chunk.events, chunk.previous_hash.as_deref())?;
        if recomputed != chunk.hash {
            return Ok(ChainVerification::broken(
                entries.len(),
                ChainBreak {
                    index,
                    chunk_id: chunk_id.clone(),
                    reason: BreakReason::HashMismatch,
                },
            ));
        }

        if index > 0 && chunk.previous_hash.as_deref() != previous_hash {
            return Ok(ChainVerification::broken(
                entries.len(),
                ChainBreak {
                    index,
                    chunk_id: chunk_id.clone(),
                    reason: BreakReason::LinkBroken,
                },
            ));
        }

        previous_hash = Some(&chunk.hash);
    }

    Ok(ChainVerification::valid(entries.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, EventCategory, SequenceRange};
    use serde_json::json;

    fn chunk(id: &str, sequence: u64, previous_hash: Option<String>) -> EventChunk {
        let events = vec![Event::new(
            sequence,
            EventCategory::Game,
            "unit_moved",
            json!({"seq": sequence}),
        )
        .with_id(format!("evt_{sequence}"))
        .with_timestamp("2026-08-20T12:00:00.000Z")];
        let hash = chunk_hash(&events, previous_hash.as_deref()).unwrap();
        EventChunk {
            chunk_id: id.to_string(),
            events,
            sequence_range: SequenceRange::new(sequence, sequence),
            hash,
            previous_hash,
        }
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let result = verify_chunk_list(&[]).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.chunk_count, 0);
        assert!(result.first_break.is_none());
    }

    #[test]
    fn test_linked_chain_is_valid() {
        let first = chunk("c1", 1, None);
        let second = chunk("c2", 2, Some(first.hash.clone()));

        let entries = vec![
            ("c1".to_string(), Some(first)),
            ("c2".to_string(), Some(second)),
        ];
        let result = verify_chunk_list(&entries).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.chunk_count, 2);
    }

    #[test]
    fn test_missing_chunk_breaks_chain() {
        let first = chunk("c1", 1, None);
        let entries = vec![("c1".to_string(), Some(first)), ("c2".to_string(), None)];

        let result = verify_chunk_list(&entries).unwrap();
        assert!(!result.is_valid);
        let first_break = result.first_break.unwrap();
        assert_eq!(first_break.index, 1);
        assert_eq!(first_break.reason, BreakReason::MissingChunk);
    }

    #[test]
    fn test_tampered_content_reports_hash_mismatch() {
        let mut tampered = chunk("c1", 1, None);
        tampered.events[0].payload = json!({"seq": 999});

        let entries = vec![("c1".to_string(), Some(tampered))];
        let result = verify_chunk_list(&entries).unwrap();
        let first_break = result.first_break.unwrap();
        assert_eq!(first_break.index, 0);
        assert_eq!(first_break.reason, BreakReason::HashMismatch);
    }

    #[test]
    fn test_wrong_previous_hash_reports_link_broken() {
        let first = chunk("c1", 1, None);
        // Internally consistent but linked to a hash that is not c1's
        let second = chunk("c2", 2, Some("0".repeat(64)));

        let entries = vec![
            ("c1".to_string(), Some(first)),
            ("c2".to_string(), Some(second)),
        ];
        let result = verify_chunk_list(&entries).unwrap();
        let first_break = result.first_break.unwrap();
        assert_eq!(first_break.index, 1);
        assert_eq!(first_break.reason, BreakReason::LinkBroken);
    }
}
