//! Event store statistics
//!
//! Cheap aggregate counts for audit viewers and dashboards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Event;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStoreStats {
    #[serde(rename = "totalEvents")]
    pub total_events: usize,

    #[serde(rename = "latestSequence")]
    pub latest_sequence: u64,

    /// Count per category name
    #[serde(rename = "eventsByCategory")]
    pub events_by_category: HashMap<String, usize>,

    /// Count per event type
    #[serde(rename = "eventsByType")]
    pub events_by_type: HashMap<String, usize>,

    /// Count per campaign id; events without a campaign are not counted
    #[serde(rename = "eventsByCampaign")]
    pub events_by_campaign: HashMap<String, usize>,
}

pub(crate) fn collect(events: &[Event], latest_sequence: u64) -> EventStoreStats {
    let mut stats = EventStoreStats {
        total_events: events.len(),
        latest_sequence,
        ..Default::default()
    };

    for event in events {
        *stats
            .events_by_category
            .entry(event.category.to_string())
            .or_insert(0) += 1;
        *stats
            .events_by_type
            .entry(event.event_type.clone())
            .or_insert(0) += 1;
        if let Some(campaign_id) = &event.context.campaign_id {
            *stats
                .events_by_campaign
                .entry(campaign_id.clone())
                .or_insert(0) += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventCategory;
    use serde_json::json;

    #[test]
    fn test_collect_counts() {
        let events = vec![
            Event::new(1, EventCategory::Game, "unit_moved", json!({})).with_campaign("c1"),
            Event::new(2, EventCategory::Game, "unit_moved", json!({})).with_campaign("c1"),
            Event::new(3, EventCategory::Pilot, "pilot_injured", json!({})),
        ];

        let stats = collect(&events, 3);
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.latest_sequence, 3);
        assert_eq!(stats.events_by_category.get("game"), Some(&2));
        assert_eq!(stats.events_by_category.get("pilot"), Some(&1));
        assert_eq!(stats.events_by_type.get("unit_moved"), Some(&2));
        assert_eq!(stats.events_by_campaign.get("c1"), Some(&2));
        assert!(!stats.events_by_campaign.contains_key("c2"));
    }

    #[test]
    fn test_collect_empty() {
        let stats = collect(&[], 0);
        assert_eq!(stats.total_events, 0);
        assert!(stats.events_by_type.is_empty());
    }
}
