//! Event types for the append-only ledger
//!
//! Events are immutable records of domain facts. Current state is never
//! stored directly; it is derived by folding events in sequence order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Coarse partition of the event space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// In-battle facts (damage, movement, destruction)
    Game,
    /// Pilot lifecycle (injuries, experience, kills)
    Pilot,
    /// Campaign progression (missions, funds, roster)
    Campaign,
    /// Bookkeeping facts about the ledger itself
    Meta,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Game => write!(f, "game"),
            EventCategory::Pilot => write!(f, "pilot"),
            EventCategory::Campaign => write!(f, "campaign"),
            EventCategory::Meta => write!(f, "meta"),
        }
    }
}

/// How an event relates to the event that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseRelationship {
    /// Direct consequence (weapon hit triggered ammo explosion)
    Triggered,
    /// Computed follow-up (damage derived a pilot injury)
    Derived,
    /// Reversal of the cause
    Undone,
    /// Replacement of the cause
    Superseded,
}

impl std::fmt::Display for CauseRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CauseRelationship::Triggered => write!(f, "triggered"),
            CauseRelationship::Derived => write!(f, "derived"),
            CauseRelationship::Undone => write!(f, "undone"),
            CauseRelationship::Superseded => write!(f, "superseded"),
        }
    }
}

/// Back-reference to the event that caused this one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausedBy {
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub relationship: CauseRelationship,
}

impl CausedBy {
    pub fn new(event_id: impl Into<String>, relationship: CauseRelationship) -> Self {
        Self {
            event_id: event_id.into(),
            relationship,
        }
    }
}

/// Optional correlation keys attaching an event to campaign entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(rename = "campaignId", skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(rename = "gameId", skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(rename = "pilotId", skip_serializing_if = "Option::is_none")]
    pub pilot_id: Option<String>,
    #[serde(rename = "unitId", skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(rename = "missionId", skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
}

impl EventContext {
    pub fn is_empty(&self) -> bool {
        self.campaign_id.is_none()
            && self.game_id.is_none()
            && self.pilot_id.is_none()
            && self.unit_id.is_none()
            && self.mission_id.is_none()
    }

    /// Partial-equality context match: every key set in `filter` must equal
    /// the corresponding key here; keys absent from the filter are ignored.
    pub fn satisfies(&self, filter: &EventContext) -> bool {
        fn key_matches(value: &Option<String>, wanted: &Option<String>) -> bool {
            match wanted {
                Some(_) => value == wanted,
                None => true,
            }
        }

        key_matches(&self.campaign_id, &filter.campaign_id)
            && key_matches(&self.game_id, &filter.game_id)
            && key_matches(&self.pilot_id, &filter.pilot_id)
            && key_matches(&self.unit_id, &filter.unit_id)
            && key_matches(&self.mission_id, &filter.mission_id)
    }
}

/// Inclusive range of sequence numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRange {
    pub from: u64,
    pub to: u64,
}

impl SequenceRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, sequence: u64) -> bool {
        sequence >= self.from && sequence <= self.to
    }
}

/// Inclusive timestamp range; bounds compare lexicographically, which is
/// chronological for the fixed-width RFC3339 strings the ledger uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl TimeRange {
    pub fn contains(&self, timestamp: &str) -> bool {
        if let Some(from) = &self.from {
            if timestamp < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if timestamp > to.as_str() {
                return false;
            }
        }
        true
    }
}

/// An immutable event in the ledger
///
/// Events are the source of truth. The `sequence` is store-wide strictly
/// increasing and never reused; gaps are allowed. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque unique id
    pub id: String,

    /// Store-wide strictly increasing position
    pub sequence: u64,

    /// RFC3339 timestamp with millisecond precision
    pub timestamp: String,

    /// Coarse partition
    pub category: EventCategory,

    /// Discriminator within the category (e.g. "unit_destroyed")
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event-specific payload, opaque to the ledger
    pub payload: Value,

    /// Correlation keys
    #[serde(default, skip_serializing_if = "EventContext::is_empty")]
    pub context: EventContext,

    /// Back-reference to the causing event, if any
    #[serde(rename = "causedBy", skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<CausedBy>,
}

impl Event {
    /// Create a new event with a generated id and current timestamp.
    pub fn new(
        sequence: u64,
        category: EventCategory,
        event_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4()),
            sequence,
            timestamp: crate::utils::now_rfc3339_millis(),
            category,
            event_type: event_type.into(),
            payload,
            context: EventContext::default(),
            caused_by: None,
        }
    }

    /// Override the generated id (for producers with their own id scheme).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Override the generated timestamp (for imports and tests).
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    /// Attach the campaign correlation key.
    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.context.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn with_caused_by(
        mut self,
        event_id: impl Into<String>,
        relationship: CauseRelationship,
    ) -> Self {
        self.caused_by = Some(CausedBy::new(event_id, relationship));
        self
    }

    /// Parse the payload as a specific type
    pub fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Serialize to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// True when this event has no causing event.
    pub fn is_root(&self) -> bool {
        self.caused_by.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_serialization() {
        let category = EventCategory::Game;
        let json = serde_json::to_string(&category).unwrap();
        assert_eq!(json, "\"game\"");

        let parsed: EventCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EventCategory::Game);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            1,
            EventCategory::Game,
            "unit_destroyed",
            json!({"unitId": "mech_01"}),
        )
        .with_id("evt_1")
        .with_timestamp("2026-08-20T12:00:00.000Z")
        .with_campaign("c1");

        let json = event.to_json_line().unwrap();
        assert!(json.contains("\"type\":\"unit_destroyed\""));
        assert!(json.contains("\"category\":\"game\""));
        assert!(json.contains("\"campaignId\":\"c1\""));
        assert!(json.contains("\"sequence\":1"));
        // No causedBy -> field omitted entirely
        assert!(!json.contains("causedBy"));

        let parsed = Event::from_json_line(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_caused_by_serialization() {
        let event = Event::new(2, EventCategory::Pilot, "pilot_injured", json!({}))
            .with_caused_by("evt_1", CauseRelationship::Derived);

        let json = event.to_json_line().unwrap();
        assert!(json.contains("\"causedBy\":{\"eventId\":\"evt_1\",\"relationship\":\"derived\"}"));
    }

    #[test]
    fn test_context_satisfies_partial_match() {
        let context = EventContext {
            campaign_id: Some("c1".to_string()),
            game_id: Some("g1".to_string()),
            ..Default::default()
        };

        let campaign_only = EventContext {
            campaign_id: Some("c1".to_string()),
            ..Default::default()
        };
        assert!(context.satisfies(&campaign_only));

        let wrong_game = EventContext {
            game_id: Some("g2".to_string()),
            ..Default::default()
        };
        assert!(!context.satisfies(&wrong_game));

        // Empty filter matches everything
        assert!(context.satisfies(&EventContext::default()));

        // Filter on a key the event does not carry
        let pilot_filter = EventContext {
            pilot_id: Some("p1".to_string()),
            ..Default::default()
        };
        assert!(!context.satisfies(&pilot_filter));
    }

    #[test]
    fn test_sequence_range_contains() {
        let range = SequenceRange::new(5, 10);
        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(4));
        assert!(!range.contains(11));
    }

    #[test]
    fn test_time_range_lexicographic() {
        let range = TimeRange {
            from: Some("2026-08-20T00:00:00.000Z".to_string()),
            to: Some("2026-08-21T00:00:00.000Z".to_string()),
        };
        assert!(range.contains("2026-08-20T12:30:00.000Z"));
        assert!(range.contains("2026-08-20T00:00:00.000Z"));
        assert!(!range.contains("2026-08-21T00:00:00.001Z"));

        let open_ended = TimeRange {
            from: Some("2026-08-20T00:00:00.000Z".to_string()),
            to: None,
        };
        assert!(open_ended.contains("2030-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Event::new(1, EventCategory::Meta, "noted", json!({}));
        let b = Event::new(2, EventCategory::Meta, "noted", json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("evt_"));
    }
}
