//! Event store - append-only sequenced log
//!
//! ```text
//! producer ──► append(event) ──► sequence gate ──► log (sequence order)
//!                                   │ rejected: SequenceError
//!                                   ▼
//!                        latest_sequence advances
//! ```
//!
//! Sequences are store-wide, strictly increasing and never reused. Gaps are
//! allowed (campaigns merge independently-sequenced fragments), duplicates
//! and regressions are not. One logical writer per store instance; the
//! interior lock exists so readers can share the store behind an `Arc`, not
//! to arbitrate concurrent writers.

mod query;
mod stats;

pub use stats::EventStoreStats;

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::types::{Event, EventCategory, EventQuery, QueryResult};

#[derive(Default)]
struct StoreInner {
    /// Events in append order, which the sequence gate makes sequence order
    events: Vec<Event>,
    /// Event id -> index of first occurrence
    by_id: HashMap<String, usize>,
    latest_sequence: u64,
}

/// Append-only event log with filter/sort/paginate queries.
#[derive(Default)]
pub struct EventStore {
    inner: RwLock<StoreInner>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. The event's sequence must be strictly greater than
    /// the store's latest; on violation the store is unchanged.
    pub fn append(&self, event: Event) -> Result<()> {
        let mut inner = self.inner.write();
        if event.sequence <= inner.latest_sequence {
            return Err(LedgerError::Sequence {
                sequence: event.sequence,
                latest: inner.latest_sequence,
            });
        }

        debug!(sequence = event.sequence, id = %event.id, "event appended");
        inner.latest_sequence = event.sequence;
        let index = inner.events.len();
        inner.by_id.entry(event.id.clone()).or_insert(index);
        inner.events.push(event);
        Ok(())
    }

    /// Append a batch atomically.
    ///
    /// The batch is sorted by sequence ascending, then each event is checked
    /// against the running expected-next sequence (`latest + 1`, advancing
    /// past each accepted event). Skipped sequences are fine; a duplicate or
    /// regression anywhere rejects the whole batch with nothing appended.
    /// Empty batch is a no-op.
    pub fn append_batch(&self, mut events: Vec<Event>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        events.sort_by_key(|e| e.sequence);

        let mut inner = self.inner.write();

        // Validate everything before touching the log
        let mut expected_next = inner.latest_sequence + 1;
        for event in &events {
            if event.sequence < expected_next {
                return Err(LedgerError::Sequence {
                    sequence: event.sequence,
                    latest: expected_next - 1,
                });
            }
            expected_next = event.sequence + 1;
        }

        debug!(count = events.len(), "batch appended");
        for event in events {
            inner.latest_sequence = event.sequence;
            let index = inner.events.len();
            inner.by_id.entry(event.id.clone()).or_insert(index);
            inner.events.push(event);
        }
        Ok(())
    }

    /// Filtered, sorted, paginated query. Filters compose by logical AND.
    pub fn query(&self, query: &EventQuery) -> QueryResult {
        let inner = self.inner.read();
        query::run_query(&inner.events, query)
    }

    /// Events with sequence in `[from, to]`, both ends inclusive.
    pub fn get_events_in_range(&self, from: u64, to: u64) -> Vec<Event> {
        let inner = self.inner.read();
        if from > to {
            return Vec::new();
        }
        // Log is sequence-sorted, so the range is one contiguous slice
        let lo = inner.events.partition_point(|e| e.sequence < from);
        let hi = inner.events.partition_point(|e| e.sequence <= to);
        inner.events[lo..hi].to_vec()
    }

    pub fn get_event_by_id(&self, id: &str) -> Option<Event> {
        let inner = self.inner.read();
        inner.by_id.get(id).map(|&i| inner.events[i].clone())
    }

    /// Events whose `causedBy` points at the given event.
    pub fn get_events_caused_by(&self, event_id: &str) -> Vec<Event> {
        let inner = self.inner.read();
        inner
            .events
            .iter()
            .filter(|e| {
                e.caused_by
                    .as_ref()
                    .map(|c| c.event_id == event_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn get_events_by_category(&self, category: EventCategory) -> Vec<Event> {
        let inner = self.inner.read();
        inner
            .events
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// The newest `n` events, newest first.
    pub fn get_recent_events(&self, n: usize) -> Vec<Event> {
        let inner = self.inner.read();
        inner.events.iter().rev().take(n).cloned().collect()
    }

    /// Full log in sequence order.
    pub fn all_events(&self) -> Vec<Event> {
        self.inner.read().events.clone()
    }

    pub fn latest_sequence(&self) -> u64 {
        self.inner.read().latest_sequence
    }

    /// The sequence the next appended event should carry.
    pub fn next_sequence(&self) -> u64 {
        self.latest_sequence() + 1
    }

    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn stats(&self) -> EventStoreStats {
        let inner = self.inner.read();
        stats::collect(&inner.events, inner.latest_sequence)
    }

    /// Reset to empty. Test/reset contexts only; appended history is
    /// otherwise permanent.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        debug!(dropped = inner.events.len(), "store cleared");
        inner.events.clear();
        inner.by_id.clear();
        inner.latest_sequence = 0;
    }
}
