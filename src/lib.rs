//! Campaign Ledger
//!
//! An event-sourcing core for campaign and battle tracking: an append-only
//! event log with tamper-evident chunked archival, deterministic state
//! derivation, and replay tooling.
//!
//! # Features
//!
//! - **Append-Only Log**: Store-wide strictly increasing sequence numbers
//! - **Tamper Evidence**: Hash-chained chunks with structured verification
//! - **Deterministic Folds**: Reducer-based state derivation with checkpoints
//! - **Causality Chains**: Cause/effect trees built from event links
//! - **State Diffing**: Structural comparison of any two derived states
//! - **Replay**: Timed playback with speed control and scrubber markers
//!
//! # Modules
//!
//! - `types`: Core data structures (Event, EventChunk, Checkpoint, queries)
//! - `store`: The in-memory append-only event log
//! - `chunks`: Hash-chained archival, checkpoints, and integrity checks
//! - `derive`: Reducer registration and state folding
//! - `causality`: Cause/effect chain construction
//! - `diff`: Structural state comparison between sequences
//! - `replay`: Playback state machine with a cancellable timer
//! - `persistence`: Key-value adapters (in-memory and JSONL-backed)
//! - `utils`: Utility functions (timestamps, atomic writes)
//!
//! # Example
//!
//! ```no_run
//! use campaign_ledger::{Event, EventCategory, EventStore};
//! use serde_json::json;
//!
//! fn main() {
//!     let store = EventStore::new();
//!     let event = Event::new(
//!         1,
//!         EventCategory::Game,
//!         "attack_declared",
//!         json!({"attacker": "mech_01", "target": "mech_02"}),
//!     );
//!     store.append(event).unwrap();
//!     assert_eq!(store.latest_sequence(), 1);
//! }
//! ```

pub mod causality;
pub mod chunks;
pub mod derive;
pub mod diff;
pub mod error;
pub mod persistence;
pub mod replay;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use causality::CausalityChainBuilder;
pub use chunks::{ChainVerification, ChunkManager};
pub use derive::{Reducer, ReducerMap, StateDerivationEngine};
pub use diff::StateDiffEngine;
pub use error::{LedgerError, Result};
pub use persistence::{JsonlAdapter, MemoryAdapter, PersistenceAdapter};
pub use replay::ReplayController;
pub use store::EventStore;
pub use types::{
    CampaignManifest, CausalityChain, CausedBy, ChainDirection, Checkpoint, DiffOptions, Event,
    EventCategory, EventChunk, EventContext, EventQuery, PlaybackState, QueryResult,
    ReplayOptions, StateDiff,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
