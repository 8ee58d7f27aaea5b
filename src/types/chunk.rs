//! Chunk, checkpoint and manifest records
//!
//! Chunks are immutable hash-linked batches of events; each chunk's hash
//! covers its event content plus the previous chunk's hash, so rewriting
//! history anywhere in a campaign breaks every later link. Checkpoints bound
//! replay cost by snapshotting derived state at a sequence. The manifest is
//! the per-campaign index tying both together.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::{Event, SequenceRange};

/// Immutable, hash-linked batch of events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChunk {
    #[serde(rename = "chunkId")]
    pub chunk_id: String,

    /// Events ordered by sequence; never empty
    pub events: Vec<Event>,

    #[serde(rename = "sequenceRange")]
    pub sequence_range: SequenceRange,

    /// Hex SHA-256 over event content + `previous_hash`
    pub hash: String,

    /// Prior chunk's hash within the same campaign; None for the first chunk
    #[serde(rename = "previousHash", skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
}

impl EventChunk {
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Snapshot of derived state at a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "checkpointId")]
    pub checkpoint_id: String,

    /// Last event sequence folded into `state`
    pub sequence: u64,

    /// Opaque derived state
    pub state: Value,

    /// Hex SHA-256 over state + sequence
    pub hash: String,

    #[serde(rename = "campaignId", skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Per-campaign index of chunks and the latest checkpoint
///
/// Created lazily on the campaign's first chunk or checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignManifest {
    #[serde(rename = "campaignId")]
    pub campaign_id: String,

    /// Chunk ids in creation order
    #[serde(rename = "chunkIds")]
    pub chunk_ids: Vec<String>,

    #[serde(rename = "latestSequence")]
    pub latest_sequence: u64,

    #[serde(rename = "latestCheckpointId", skip_serializing_if = "Option::is_none")]
    pub latest_checkpoint_id: Option<String>,

    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl CampaignManifest {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            chunk_ids: Vec::new(),
            latest_sequence: 0,
            latest_checkpoint_id: None,
            updated_at: crate::utils::now_rfc3339_millis(),
        }
    }

    pub fn last_chunk_id(&self) -> Option<&str> {
        self.chunk_ids.last().map(String::as_str)
    }
}
