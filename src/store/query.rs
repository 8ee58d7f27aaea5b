//! Query execution over the event log
//!
//! Filters compose by logical AND; sorting and pagination run on the
//! filtered set. Large logs are filtered in parallel.

use rayon::prelude::*;

use crate::types::{Event, EventQuery, QueryResult, SortBy, SortOrder};

/// Threshold for using parallel filtering (event count)
const PARALLEL_FILTER_THRESHOLD: usize = 1000;

pub(crate) fn run_query(events: &[Event], query: &EventQuery) -> QueryResult {
    let mut matched: Vec<Event> = if events.len() > PARALLEL_FILTER_THRESHOLD {
        events
            .par_iter()
            .filter(|e| matches_filters(e, query))
            .cloned()
            .collect()
    } else {
        events
            .iter()
            .filter(|e| matches_filters(e, query))
            .cloned()
            .collect()
    };

    sort_events(&mut matched, query.sort_by, query.sort_order);

    let total = matched.len();
    let has_more = match query.limit {
        Some(limit) => query.offset + limit < total,
        None => false,
    };

    let events: Vec<Event> = match query.limit {
        Some(limit) => matched.into_iter().skip(query.offset).take(limit).collect(),
        None => matched.into_iter().skip(query.offset).collect(),
    };

    QueryResult {
        events,
        total,
        has_more,
    }
}

fn matches_filters(event: &Event, query: &EventQuery) -> bool {
    if let Some(category) = query.category {
        if event.category != category {
            return false;
        }
    }

    if let Some(types) = &query.event_types {
        if !types.iter().any(|t| t == &event.event_type) {
            return false;
        }
    }

    if let Some(context) = &query.context {
        if !event.context.satisfies(context) {
            return false;
        }
    }

    if let Some(range) = &query.sequence_range {
        if !range.contains(event.sequence) {
            return false;
        }
    }

    if let Some(range) = &query.time_range {
        if !range.contains(&event.timestamp) {
            return false;
        }
    }

    if let Some(cause_id) = &query.caused_by_event_id {
        let caused_by_matches = event
            .caused_by
            .as_ref()
            .map(|c| &c.event_id == cause_id)
            .unwrap_or(false);
        if !caused_by_matches {
            return false;
        }
    }

    if query.root_events_only && event.caused_by.is_some() {
        return false;
    }

    true
}

fn sort_events(events: &mut [Event], sort_by: SortBy, sort_order: SortOrder) {
    match sort_by {
        SortBy::Sequence => events.sort_by_key(|e| e.sequence),
        SortBy::Timestamp => events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
    }
    if sort_order == SortOrder::Descending {
        events.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CauseRelationship, EventCategory, EventContext, TimeRange};
    use serde_json::json;

    fn fixture() -> Vec<Event> {
        vec![
            Event::new(1, EventCategory::Game, "unit_moved", json!({}))
                .with_id("e1")
                .with_timestamp("2026-08-20T10:00:00.000Z")
                .with_campaign("c1"),
            Event::new(2, EventCategory::Game, "unit_destroyed", json!({}))
                .with_id("e2")
                .with_timestamp("2026-08-20T11:00:00.000Z")
                .with_campaign("c1")
                .with_caused_by("e1", CauseRelationship::Triggered),
            Event::new(3, EventCategory::Pilot, "pilot_injured", json!({}))
                .with_id("e3")
                .with_timestamp("2026-08-20T09:00:00.000Z")
                .with_campaign("c2"),
            Event::new(4, EventCategory::Campaign, "mission_completed", json!({}))
                .with_id("e4")
                .with_timestamp("2026-08-20T12:00:00.000Z")
                .with_campaign("c1"),
        ]
    }

    #[test]
    fn test_unfiltered_query_returns_all() {
        let events = fixture();
        let result = run_query(&events, &EventQuery::new());
        assert_eq!(result.total, 4);
        assert_eq!(result.events.len(), 4);
        assert!(!result.has_more);
    }

    #[test]
    fn test_category_filter() {
        let events = fixture();
        let result = run_query(&events, &EventQuery::new().with_category(EventCategory::Game));
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_type_filter_any_of() {
        let events = fixture();
        let query = EventQuery::new().with_types(["unit_moved", "pilot_injured"]);
        let result = run_query(&events, &query);
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_context_filter_partial() {
        let events = fixture();
        let context = EventContext {
            campaign_id: Some("c1".to_string()),
            ..Default::default()
        };
        let result = run_query(&events, &EventQuery::new().with_context(context));
        assert_eq!(result.total, 3);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let events = fixture();
        let context = EventContext {
            campaign_id: Some("c1".to_string()),
            ..Default::default()
        };
        let query = EventQuery::new()
            .with_category(EventCategory::Game)
            .with_context(context)
            .with_sequence_range(2, 4);
        let result = run_query(&events, &query);
        assert_eq!(result.total, 1);
        assert_eq!(result.events[0].id, "e2");
    }

    #[test]
    fn test_time_range_filter() {
        let events = fixture();
        let query = EventQuery::new().with_time_range(TimeRange {
            from: Some("2026-08-20T10:30:00.000Z".to_string()),
            to: None,
        });
        let result = run_query(&events, &query);
        assert_eq!(result.total, 2); // e2, e4
    }

    #[test]
    fn test_caused_by_and_root_filters() {
        let events = fixture();

        let caused = run_query(&events, &EventQuery::new().with_caused_by("e1"));
        assert_eq!(caused.total, 1);
        assert_eq!(caused.events[0].id, "e2");

        let roots = run_query(&events, &EventQuery::new().root_events_only());
        assert_eq!(roots.total, 3);
        assert!(roots.events.iter().all(|e| e.caused_by.is_none()));
    }

    #[test]
    fn test_sort_by_timestamp() {
        let events = fixture();
        let query = EventQuery::new().sort_by(SortBy::Timestamp, SortOrder::Ascending);
        let result = run_query(&events, &query);
        let ids: Vec<&str> = result.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e1", "e2", "e4"]);
    }

    #[test]
    fn test_sort_descending() {
        let events = fixture();
        let query = EventQuery::new().sort_by(SortBy::Sequence, SortOrder::Descending);
        let result = run_query(&events, &query);
        let sequences: Vec<u64> = result.events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_pagination_and_has_more() {
        let events = fixture();

        let page1 = run_query(&events, &EventQuery::new().paginate(0, 3));
        assert_eq!(page1.events.len(), 3);
        assert_eq!(page1.total, 4);
        assert!(page1.has_more);

        let page2 = run_query(&events, &EventQuery::new().paginate(3, 3));
        assert_eq!(page2.events.len(), 1);
        assert!(!page2.has_more);

        let beyond = run_query(&events, &EventQuery::new().paginate(10, 3));
        assert!(beyond.events.is_empty());
        assert_eq!(beyond.total, 4);
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        // Cross the parallel threshold and verify order is preserved
        let mut events = Vec::new();
        for seq in 1..=1500u64 {
            let category = if seq % 2 == 0 {
                EventCategory::Game
            } else {
                EventCategory::Pilot
            };
            events.push(
                Event::new(seq, category, "tick", json!({}))
                    .with_id(format!("e{seq}"))
                    .with_timestamp(format!("2026-08-20T10:00:{:02}.{:03}Z", seq / 60, seq % 60)),
            );
        }

        let query = EventQuery::new().with_category(EventCategory::Game);
        let result = run_query(&events, &query);
        assert_eq!(result.total, 750);
        let sorted = result
            .events
            .windows(2)
            .all(|w| w[0].sequence < w[1].sequence);
        assert!(sorted);
    }
}
