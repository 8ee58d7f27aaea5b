//! Query options and results for the event store

use serde::{Deserialize, Serialize};

use super::event::{EventCategory, EventContext, SequenceRange, TimeRange};
use super::Event;

/// Sort key for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Sequence,
    Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter, sort and pagination options; filters compose by logical AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQuery {
    /// Exact category match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,

    /// Any-of type match
    #[serde(rename = "types", skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,

    /// Partial context equality; keys absent from the filter are ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,

    #[serde(rename = "sequenceRange", skip_serializing_if = "Option::is_none")]
    pub sequence_range: Option<SequenceRange>,

    #[serde(rename = "timeRange", skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    /// Events whose `causedBy.eventId` equals this id
    #[serde(rename = "causedByEventId", skip_serializing_if = "Option::is_none")]
    pub caused_by_event_id: Option<String>,

    /// Only events with no `causedBy` at all
    #[serde(rename = "rootEventsOnly", default)]
    pub root_events_only: bool,

    #[serde(rename = "sortBy", default)]
    pub sort_by: SortBy,

    #[serde(rename = "sortOrder", default)]
    pub sort_order: SortOrder,

    #[serde(default)]
    pub offset: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_sequence_range(mut self, from: u64, to: u64) -> Self {
        self.sequence_range = Some(SequenceRange::new(from, to));
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn with_caused_by(mut self, event_id: impl Into<String>) -> Self {
        self.caused_by_event_id = Some(event_id.into());
        self
    }

    pub fn root_events_only(mut self) -> Self {
        self.root_events_only = true;
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    /// Pagination window over the sorted, filtered result.
    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Result of a paginated query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub events: Vec<Event>,

    /// Post-filter, pre-pagination count
    pub total: usize,

    #[serde(rename = "hasMore")]
    pub has_more: bool,
}
