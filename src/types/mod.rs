//! Data types for the campaign ledger
//!
//! This module contains all the core data structures used throughout the crate.

mod causality;
mod chunk;
mod diff;
mod event;
mod query;
mod replay;

pub use causality::{ByRelationship, CausalityChain, ChainDirection, ChainNode, ChainStats};
pub use chunk::{CampaignManifest, Checkpoint, EventChunk};
pub use diff::{ChangeType, DiffEntry, DiffOptions, DiffSummary, StateDiff};
pub use event::{
    CauseRelationship, CausedBy, Event, EventCategory, EventContext, SequenceRange, TimeRange,
};
pub use query::{EventQuery, QueryResult, SortBy, SortOrder};
pub use replay::{
    next_speed, prev_speed, snap_speed, PlaybackState, ReplayOptions, ReplayStatus, SPEED_LADDER,
};
