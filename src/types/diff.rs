//! Structural diff data structures

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    /// Never emitted; present so consumers can model the full change space
    Unchanged,
}

/// One structural difference at a JSON-like path (e.g. `units[0].armor.head`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: String,

    #[serde(rename = "changeType")]
    pub change_type: ChangeType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl DiffEntry {
    pub fn added(path: impl Into<String>, after: Value) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Added,
            before: None,
            after: Some(after),
        }
    }

    pub fn removed(path: impl Into<String>, before: Value) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Removed,
            before: Some(before),
            after: None,
        }
    }

    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            change_type: ChangeType::Modified,
            before: Some(before),
            after: Some(after),
        }
    }
}

/// Counts over a diff's entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub total: usize,
}

impl DiffSummary {
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Unchanged => {}
            }
        }
        summary.total = summary.added + summary.removed + summary.modified;
        summary
    }
}

/// Difference between the derived states at two sequence points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDiff {
    /// Lower of the two requested sequences
    #[serde(rename = "sequenceA")]
    pub sequence_a: u64,

    #[serde(rename = "sequenceB")]
    pub sequence_b: u64,

    /// Events with sequence in `(sequence_a, sequence_b]`
    #[serde(rename = "eventsBetween")]
    pub events_between: Vec<Event>,

    pub entries: Vec<DiffEntry>,

    pub summary: DiffSummary,
}

/// Diff engine tuning
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Depth at which a differing subtree collapses into one modified entry
    pub max_depth: usize,

    /// Exact paths to skip entirely (volatile fields like timestamps)
    pub ignore_paths: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_depth: 16,
            ignore_paths: Vec::new(),
        }
    }
}

impl DiffOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn ignore_path(mut self, path: impl Into<String>) -> Self {
        self.ignore_paths.push(path.into());
        self
    }
}
