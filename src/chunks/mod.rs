//! Chunk manager - hash-chained segments and checkpoints
//!
//! ```text
//! events ──► create_chunk ──► [chunk n] ──hash──► [chunk n+1] ──► ...
//!                │                │
//!                ▼                ▼
//!          campaign manifest   checkpoints (derived state snapshots)
//! ```
//!
//! Chunks are immutable once sealed. Each chunk's hash covers its events
//! plus the previous chunk's hash, so a campaign's chunk list forms a
//! tamper-evident chain; `verify_campaign_integrity` walks it and reports
//! the first break. Checkpoints snapshot derived state so later derivations
//! can skip replaying from sequence zero. Everything is stored through a
//! pluggable key-value adapter.

mod hash;
mod integrity;

pub use hash::{checkpoint_hash, chunk_hash, hex_sha256};
pub use integrity::{BreakReason, ChainBreak, ChainVerification};

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::persistence::PersistenceAdapter;
use crate::types::{CampaignManifest, Checkpoint, Event, EventChunk, SequenceRange};
use crate::utils::now_rfc3339_millis;

const CHUNKS_STORE: &str = "chunks";
const CHECKPOINTS_STORE: &str = "checkpoints";
const MANIFESTS_STORE: &str = "manifests";

/// Seals events into hash-chained chunks and manages checkpoints.
///
/// Construct one per storage backend; instances share nothing globally.
#[derive(Clone)]
pub struct ChunkManager {
    adapter: Arc<dyn PersistenceAdapter>,
}

impl ChunkManager {
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self { adapter }
    }

    /// Seal events into an immutable chunk.
    ///
    /// `previous_hash` links the chunk into a campaign's chain; when not
    /// supplied it is derived from the campaign manifest's last chunk (None
    /// for the campaign's first chunk). Campaign-scoped chunks are appended
    /// to the manifest, advancing its `latest_sequence` to the chunk's upper
    /// bound.
    pub fn create_chunk(
        &self,
        mut events: Vec<Event>,
        campaign_id: Option<&str>,
        previous_hash: Option<String>,
    ) -> Result<EventChunk> {
        if events.is_empty() {
            return Err(LedgerError::EmptyChunk);
        }
        events.sort_by_key(|e| e.sequence);

        let previous_hash = match previous_hash {
            Some(explicit) => Some(explicit),
            None => match campaign_id {
                Some(campaign_id) => self.last_chunk_hash(campaign_id)?,
                None => None,
            },
        };

        let sequence_range = SequenceRange::new(
            events[0].sequence,
            events[events.len() - 1].sequence,
        );
        let hash = chunk_hash(&events, previous_hash.as_deref())?;
        let chunk = EventChunk {
            chunk_id: format!("chunk_{}", Uuid::new_v4()),
            events,
            sequence_range,
            hash,
            previous_hash,
        };

        self.adapter.put(
            CHUNKS_STORE,
            &chunk.chunk_id,
            serde_json::to_value(&chunk)?,
        )?;

        if let Some(campaign_id) = campaign_id {
            let mut manifest = self
                .load_manifest(campaign_id)?
                .unwrap_or_else(|| CampaignManifest::new(campaign_id));
            manifest.chunk_ids.push(chunk.chunk_id.clone());
            manifest.latest_sequence = chunk.sequence_range.to;
            manifest.updated_at = now_rfc3339_millis();
            self.save_manifest(&manifest)?;
        }

        info!(
            chunk_id = %chunk.chunk_id,
            events = chunk.event_count(),
            from = chunk.sequence_range.from,
            to = chunk.sequence_range.to,
            campaign = campaign_id.unwrap_or("-"),
            "chunk sealed"
        );
        Ok(chunk)
    }

    /// Load a chunk that must exist.
    pub fn load_chunk(&self, chunk_id: &str) -> Result<EventChunk> {
        match self.adapter.get(CHUNKS_STORE, chunk_id)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(LedgerError::not_found("chunk", chunk_id)),
        }
    }

    /// A campaign's chunks in manifest (creation) order. Empty when the
    /// campaign has no manifest yet.
    pub fn get_chunks_for_campaign(&self, campaign_id: &str) -> Result<Vec<EventChunk>> {
        let Some(manifest) = self.load_manifest(campaign_id)? else {
            return Ok(Vec::new());
        };
        manifest
            .chunk_ids
            .iter()
            .map(|id| self.load_chunk(id))
            .collect()
    }

    /// Snapshot derived state at a sequence.
    ///
    /// Campaign-scoped checkpoints become the manifest's latest checkpoint.
    pub fn create_checkpoint(
        &self,
        sequence: u64,
        state: Value,
        campaign_id: Option<&str>,
    ) -> Result<Checkpoint> {
        let hash = checkpoint_hash(&state, sequence)?;
        let checkpoint = Checkpoint {
            checkpoint_id: format!("ckpt_{}", Uuid::new_v4()),
            sequence,
            state,
            hash,
            campaign_id: campaign_id.map(String::from),
            created_at: now_rfc3339_millis(),
        };

        self.adapter.put(
            CHECKPOINTS_STORE,
            &checkpoint.checkpoint_id,
            serde_json::to_value(&checkpoint)?,
        )?;

        if let Some(campaign_id) = campaign_id {
            let mut manifest = self
                .load_manifest(campaign_id)?
                .unwrap_or_else(|| CampaignManifest::new(campaign_id));
            manifest.latest_checkpoint_id = Some(checkpoint.checkpoint_id.clone());
            manifest.updated_at = now_rfc3339_millis();
            self.save_manifest(&manifest)?;
        }

        info!(
            checkpoint_id = %checkpoint.checkpoint_id,
            sequence,
            campaign = campaign_id.unwrap_or("-"),
            "checkpoint created"
        );
        Ok(checkpoint)
    }

    pub fn load_checkpoint(&self, checkpoint_id: &str) -> Result<Checkpoint> {
        match self.adapter.get(CHECKPOINTS_STORE, checkpoint_id)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(LedgerError::not_found("checkpoint", checkpoint_id)),
        }
    }

    /// The manifest's latest checkpoint, or None when the campaign has none.
    pub fn get_latest_checkpoint(&self, campaign_id: &str) -> Result<Option<Checkpoint>> {
        let Some(manifest) = self.load_manifest(campaign_id)? else {
            return Ok(None);
        };
        match manifest.latest_checkpoint_id {
            Some(id) => Ok(Some(self.load_checkpoint(&id)?)),
            None => Ok(None),
        }
    }

    /// The campaign checkpoint with the greatest sequence at or below the
    /// target, or None when every checkpoint exceeds it.
    pub fn find_checkpoint_before(
        &self,
        campaign_id: &str,
        sequence: u64,
    ) -> Result<Option<Checkpoint>> {
        let mut best: Option<Checkpoint> = None;
        for value in self.adapter.get_all(CHECKPOINTS_STORE)? {
            let checkpoint: Checkpoint = match serde_json::from_value(value) {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable checkpoint record");
                    continue;
                }
            };
            if checkpoint.campaign_id.as_deref() != Some(campaign_id)
                || checkpoint.sequence > sequence
            {
                continue;
            }
            if best
                .as_ref()
                .map(|b| checkpoint.sequence > b.sequence)
                .unwrap_or(true)
            {
                best = Some(checkpoint);
            }
        }
        Ok(best)
    }

    /// Walk a campaign's chunk chain, recomputing hashes and confirming
    /// every `previousHash` link. A campaign with no manifest verifies as an
    /// empty, valid chain.
    pub fn verify_campaign_integrity(&self, campaign_id: &str) -> Result<ChainVerification> {
        let Some(manifest) = self.load_manifest(campaign_id)? else {
            return Ok(ChainVerification::valid(0));
        };

        let mut entries = Vec::with_capacity(manifest.chunk_ids.len());
        for chunk_id in &manifest.chunk_ids {
            // Unreadable counts as missing; verification reports, never fails
            let chunk = match self.adapter.get(CHUNKS_STORE, chunk_id)? {
                Some(value) => match serde_json::from_value(value) {
                    Ok(chunk) => Some(chunk),
                    Err(e) => {
                        warn!(chunk_id = %chunk_id, error = %e, "unreadable chunk record");
                        None
                    }
                },
                None => None,
            };
            entries.push((chunk_id.clone(), chunk));
        }

        let verification = integrity::verify_chunk_list(&entries)?;
        if !verification.is_valid {
            warn!(
                campaign = campaign_id,
                first_break = ?verification.first_break,
                "chunk chain verification failed"
            );
        }
        Ok(verification)
    }

    /// Recompute one chunk's hash and compare it to the stored value.
    /// Detects in-place tampering of chunk content.
    pub fn verify_chunk(&self, chunk_id: &str) -> Result<bool> {
        let chunk = self.load_chunk(chunk_id)?;
        let recomputed = chunk_hash(&chunk.events, chunk.previous_hash.as_deref())?;
        Ok(recomputed == chunk.hash)
    }

    /// Flatten a campaign's chunk events, optionally range-filtered, and
    /// re-sort by sequence. Chunks sharing storage are not guaranteed
    /// internally non-overlapping, so the re-sort is required.
    pub fn get_events_from_chunks(
        &self,
        campaign_id: &str,
        range: Option<SequenceRange>,
    ) -> Result<Vec<Event>> {
        let chunks = self.get_chunks_for_campaign(campaign_id)?;
        let mut events: Vec<Event> = chunks
            .into_iter()
            .flat_map(|c| c.events)
            .filter(|e| range.map(|r| r.contains(e.sequence)).unwrap_or(true))
            .collect();
        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Drop every chunk, checkpoint and manifest. Test/reset contexts only.
    pub fn clear(&self) -> Result<()> {
        self.clear_store(CHUNKS_STORE, |v| {
            v.get("chunkId").and_then(Value::as_str).map(String::from)
        })?;
        self.clear_store(CHECKPOINTS_STORE, |v| {
            v.get("checkpointId")
                .and_then(Value::as_str)
                .map(String::from)
        })?;
        self.clear_store(MANIFESTS_STORE, |v| {
            v.get("campaignId")
                .and_then(Value::as_str)
                .map(String::from)
        })?;
        Ok(())
    }

    fn clear_store(&self, store: &str, key_of: impl Fn(&Value) -> Option<String>) -> Result<()> {
        for value in self.adapter.get_all(store)? {
            match key_of(&value) {
                Some(key) => {
                    self.adapter.delete(store, &key)?;
                }
                None => warn!(store, "skipping record without a key during clear"),
            }
        }
        Ok(())
    }

    fn last_chunk_hash(&self, campaign_id: &str) -> Result<Option<String>> {
        let Some(manifest) = self.load_manifest(campaign_id)? else {
            return Ok(None);
        };
        match manifest.last_chunk_id() {
            Some(chunk_id) => Ok(Some(self.load_chunk(chunk_id)?.hash)),
            None => Ok(None),
        }
    }

    fn load_manifest(&self, campaign_id: &str) -> Result<Option<CampaignManifest>> {
        match self.adapter.get(MANIFESTS_STORE, campaign_id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save_manifest(&self, manifest: &CampaignManifest) -> Result<()> {
        self.adapter.put(
            MANIFESTS_STORE,
            &manifest.campaign_id,
            serde_json::to_value(manifest)?,
        )
    }
}
